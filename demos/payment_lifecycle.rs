//! Payment Lifecycle
//!
//! This example drives a payment through Initiated -> Processing ->
//! Completed/Failed and keeps an external status store in sync.
//!
//! Key concepts:
//! - Guards on the payment amount and on transition parameters
//! - An action that calls a (mock) payment gateway
//! - A subscriber task that persists every status change
//! - Snapshotting the finished machine
//!
//! Run with: RUST_LOG=debug cargo run --example payment_lifecycle

use serde::{Deserialize, Serialize};
use statekeeper::builder::{MachineBuilder, StateBuilder, TransitionBuilder};
use statekeeper::core::{HookError, Params};
use statekeeper::{async_trait, params, MachineEvent, StateBehavior, StateMachine};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Payment {
    id: String,
    amount: u64,
    currency: String,
}

// Mock gateway shared with the submit action
#[derive(Default)]
struct MockGateway {
    charges: Mutex<Vec<(String, u64)>>,
}

impl MockGateway {
    fn charge(&self, payment: &Payment) -> Result<String, String> {
        if payment.currency != "EUR" {
            return Err(format!("currency {} not supported", payment.currency));
        }
        let mut charges = self.charges.lock().map_err(|e| e.to_string())?;
        charges.push((payment.id.clone(), payment.amount));
        Ok(format!("auth-{}", charges.len()))
    }
}

// In-memory stand-in for the host's payment table
#[derive(Default)]
struct StatusStore {
    statuses: Mutex<HashMap<String, Vec<String>>>,
}

impl StatusStore {
    fn record(&self, payment_id: &str, status: &str) {
        if let Ok(mut statuses) = self.statuses.lock() {
            statuses
                .entry(payment_id.to_string())
                .or_default()
                .push(status.to_string());
        }
    }

    fn trail(&self, payment_id: &str) -> Vec<String> {
        self.statuses
            .lock()
            .map(|statuses| statuses.get(payment_id).cloned().unwrap_or_default())
            .unwrap_or_default()
    }
}

struct Processing;

#[async_trait]
impl StateBehavior<Payment> for Processing {
    async fn on_enter(&self, payment: &Payment, _params: &Params) {
        info!(payment = %payment.id, amount = payment.amount, "awaiting settlement");
    }
}

fn lifecycle(gateway: Arc<MockGateway>) -> Result<MachineBuilder<Payment>, Box<dyn std::error::Error>> {
    let builder = MachineBuilder::new()
        .machine_id("payment-pay-001")
        .add_state(StateBuilder::new("Initiated").initial())?
        .add_state(StateBuilder::new("Processing").behavior(Processing))?
        .add_state(StateBuilder::new("Completed").final_state())?
        .add_state(StateBuilder::new("Failed").final_state())?
        .transition(
            TransitionBuilder::new()
                .from("Initiated")
                .to("Processing")
                .on("submit")
                .when(|payment: &Payment, _: &Params| payment.amount > 0)
                .perform(move |payment: &Payment, _: &Params| {
                    gateway
                        .charge(payment)
                        .map(|auth| info!(%auth, "gateway authorized charge"))
                        .map_err(|e| HookError::new("gateway rejected charge").with_cause(e))
                }),
        )?
        .transition(
            TransitionBuilder::new()
                .from("Processing")
                .to("Completed")
                .on("settle")
                .priority(10)
                .when(|_: &Payment, params: &Params| params.contains_key("TransactionId")),
        )?
        .transition(
            TransitionBuilder::new()
                .from("Processing")
                .to("Failed")
                .on("settle")
                .when(|_: &Payment, params: &Params| params.contains_key("ErrorCode")),
        )?;
    Ok(builder)
}

async fn run(machine: &mut StateMachine<Payment>) {
    println!("Step 1: Submit");
    println!("  fired: {}", machine.fire_event("submit", Params::new()).await);

    println!("Step 2: Settle without a transaction id");
    if let Err(e) = machine.try_fire_event("settle", Params::new()).await {
        println!("  rejected: {e}");
    }

    println!("Step 3: Settle with a transaction id");
    match machine
        .transition_to("Completed", params! { "TransactionId" => "tx-1" })
        .await
    {
        Ok(entry) => println!("  {} -> {}", entry.from, entry.to),
        Err(e) => println!("  error: {e}"),
    }

    println!("Step 4: Try to fail a completed payment");
    if let Err(e) = machine
        .transition_to("Failed", params! { "ErrorCode" => "E1" })
        .await
    {
        println!("  rejected: {e}");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    println!("=== Payment Lifecycle ===\n");

    let gateway = Arc::new(MockGateway::default());
    let store = Arc::new(StatusStore::default());
    let payment = Payment {
        id: "pay-001".to_string(),
        amount: 14_999,
        currency: "EUR".to_string(),
    };

    let mut machine = lifecycle(Arc::clone(&gateway))?
        .initialize(payment.clone(), None)
        .await?;
    store.record(&payment.id, machine.current_state().name());

    let report = machine.validate();
    println!(
        "Validation: valid={} warnings={} errors={}\n",
        report.is_valid,
        report.warnings.len(),
        report.errors.len()
    );

    // persist every status change, like a database adapter would
    let mut events = machine.subscribe();
    let persister = {
        let store = Arc::clone(&store);
        let payment_id = payment.id.clone();
        tokio::spawn(async move {
            while let Ok(event) = events.recv().await {
                match event {
                    MachineEvent::StateChanged { to, .. } => store.record(&payment_id, &to),
                    MachineEvent::ErrorOccurred { message, .. } => {
                        info!(%message, "transition rejected")
                    }
                    _ => {}
                }
            }
        })
    };

    run(&mut machine).await;

    let snapshot = machine.create_snapshot()?;
    println!("\nSnapshot:\n{}", snapshot.to_json()?);

    // closing the channel ends the persister
    drop(machine);
    persister.await?;

    println!("\nStatus trail: {}", store.trail(&payment.id).join(" -> "));
    println!(
        "Gateway charges: {:?}",
        gateway.charges.lock().map(|c| c.clone()).unwrap_or_default()
    );

    println!("\n=== Example Complete ===");
    Ok(())
}
