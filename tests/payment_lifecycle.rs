//! Payment lifecycle scenarios driven end to end.

use serde::{Deserialize, Serialize};
use statekeeper::builder::{MachineBuilder, StateBuilder, TransitionBuilder};
use statekeeper::core::Params;
use statekeeper::{params, MachineEvent, Snapshot, StateMachine, TransitionError};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct Payment {
    id: String,
    amount: u64,
    currency: String,
}

fn payment(amount: u64) -> Payment {
    Payment {
        id: "pay-001".to_string(),
        amount,
        currency: "EUR".to_string(),
    }
}

fn lifecycle() -> MachineBuilder<Payment> {
    MachineBuilder::new()
        .machine_id("payment-pay-001")
        .add_state(StateBuilder::new("Initiated").initial())
        .unwrap()
        .add_state(StateBuilder::new("Processing"))
        .unwrap()
        .add_state(StateBuilder::new("Completed").final_state())
        .unwrap()
        .add_state(StateBuilder::new("Failed").final_state())
        .unwrap()
        .transition(
            TransitionBuilder::new()
                .from("Initiated")
                .to("Processing")
                .on("submit")
                .when(|payment: &Payment, _: &Params| payment.amount > 0),
        )
        .unwrap()
        .transition(
            TransitionBuilder::new()
                .from("Processing")
                .to("Completed")
                .on("settle")
                .when(|_: &Payment, params: &Params| params.contains_key("TransactionId")),
        )
        .unwrap()
        .transition(
            TransitionBuilder::new()
                .from("Processing")
                .to("Failed")
                .on("settle")
                .when(|_: &Payment, params: &Params| params.contains_key("ErrorCode")),
        )
        .unwrap()
}

async fn processing() -> StateMachine<Payment> {
    let mut machine = lifecycle().initialize(payment(100), None).await.unwrap();
    machine
        .transition_to("Processing", Params::new())
        .await
        .unwrap();
    machine
}

#[tokio::test]
async fn completion_requires_transaction_id() {
    let mut machine = lifecycle().initialize(payment(100), None).await.unwrap();
    assert_eq!(machine.current_state().name(), "Initiated");

    machine
        .transition_to("Processing", Params::new())
        .await
        .unwrap();
    assert_eq!(machine.current_state().name(), "Processing");

    let err = machine
        .transition_to("Completed", Params::new())
        .await
        .unwrap_err();

    assert!(matches!(err, TransitionError::GuardRejected { .. }));
    assert!(err.to_string().contains("Guard rejected"));
    assert_eq!(machine.current_state().name(), "Processing");
}

#[tokio::test]
async fn zero_amount_never_leaves_initiated() {
    let mut machine = lifecycle().initialize(payment(0), None).await.unwrap();

    assert!(!machine.can_transition_to("Processing", &Params::new()).await);
    assert!(!machine.fire_event("submit", Params::new()).await);
    assert_eq!(machine.current_state().name(), "Initiated");
}

#[tokio::test]
async fn completed_payment_cannot_fail() {
    let mut machine = processing().await;

    machine
        .transition_to("Completed", params! { "TransactionId" => "tx-1" })
        .await
        .unwrap();
    let err = machine
        .transition_to("Failed", params! { "ErrorCode" => "E1" })
        .await
        .unwrap_err();

    assert_eq!(
        err,
        TransitionError::FinalState {
            state: "Completed".to_string()
        }
    );
    assert_eq!(machine.current_state().name(), "Completed");
}

#[tokio::test]
async fn settle_event_routes_on_params() {
    let mut failed = processing().await;
    let mut completed = processing().await;

    assert!(failed.fire_event("settle", params! { "ErrorCode" => "E1" }).await);
    assert!(completed.fire_event("settle", params! { "TransactionId" => "tx-9" }).await);

    assert_eq!(failed.current_state().name(), "Failed");
    assert_eq!(completed.current_state().name(), "Completed");
    assert_eq!(
        completed.history().last().unwrap().params["TransactionId"],
        "tx-9"
    );
}

#[tokio::test]
async fn completed_payment_restores_into_fresh_machine() {
    let mut machine = processing().await;
    machine
        .transition_to("Completed", params! { "TransactionId" => "tx-1" })
        .await
        .unwrap();
    let persisted = machine.create_snapshot().unwrap().to_json().unwrap();

    let snapshot = Snapshot::from_json(&persisted).unwrap();
    let mut fresh = lifecycle().initialize(payment(100), None).await.unwrap();
    fresh.restore_from_snapshot(&snapshot).unwrap();

    assert_eq!(fresh.current_state().name(), "Completed");
    assert_eq!(fresh.history().len(), 2);
    assert_eq!(
        fresh.history().get_path(),
        vec!["Initiated", "Processing", "Completed"]
    );
    assert_eq!(snapshot.context_as::<Payment>().unwrap(), payment(100));
}

#[tokio::test]
async fn status_changes_reach_subscribers() {
    let mut machine = lifecycle().initialize(payment(100), None).await.unwrap();
    let mut events = machine.subscribe();

    machine.fire_event("submit", Params::new()).await;
    machine
        .fire_event("settle", params! { "TransactionId" => "tx-1" })
        .await;

    let mut statuses = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let MachineEvent::StateChanged { to, .. } = event {
            statuses.push(to);
        }
    }
    assert_eq!(statuses, vec!["Processing", "Completed"]);
}

#[tokio::test]
async fn lifecycle_validates_cleanly() {
    let machine = lifecycle().initialize(payment(100), None).await.unwrap();

    let report = machine.validate();

    assert!(report.is_valid);
    assert!(report.warnings.is_empty());
}
