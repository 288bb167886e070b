//! Macros for ergonomic state machine construction.

/// Build a [`crate::core::Params`] map from `key => value` pairs.
///
/// Values are anything `serde_json::json!` accepts.
///
/// # Example
///
/// ```
/// use statekeeper::params;
///
/// let params = params! { "amount" => 100, "currency" => "EUR" };
/// assert_eq!(params["amount"], 100);
///
/// let empty = params! {};
/// assert!(empty.is_empty());
/// ```
#[macro_export]
macro_rules! params {
    () => {
        $crate::core::Params::new()
    };
    ($($key:expr => $value:tt),+ $(,)?) => {{
        let mut params = $crate::core::Params::new();
        $(
            params.insert(::std::string::String::from($key), $crate::__serde_json::json!($value));
        )+
        params
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn params_macro_builds_map() {
        let reason = "card declined";
        let params = params! {
            "attempt" => 2,
            "reason" => reason,
            "tags" => ["retry", "card"],
        };

        assert_eq!(params.len(), 3);
        assert_eq!(params["attempt"], 2);
        assert_eq!(params["reason"], "card declined");
        assert_eq!(params["tags"][1], "card");
    }

    #[test]
    fn params_macro_supports_empty_map() {
        let params = params! {};

        assert!(params.is_empty());
    }
}
