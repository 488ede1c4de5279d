//! The single executor task (§4.4 "Concurrency inside the daemon", §9
//! "Single-executor serialization"). Every `CALL` is enqueued here and run
//! one at a time against the held `RemoteObject`; no mutex ever guards the
//! object itself, only the channel discipline does.

use std::panic::AssertUnwindSafe;

use serde_json::{Map, Value};
use tokio::sync::{mpsc, oneshot};

use loopback_core::RemoteObject;

/// One `CALL` enqueued for the executor, with a single-use reply channel
/// back to the handler that submitted it.
pub struct ExecItem {
    pub method: String,
    pub args: Vec<Value>,
    pub kwargs: Map<String, Value>,
    pub reply: oneshot::Sender<Result<Value, String>>,
}

/// Run forever, draining `rx` and invoking calls on `object` strictly in
/// arrival order. Exits once the channel closes (all senders dropped),
/// which happens when the listener shuts down after draining whatever is
/// already enqueued, matching §4.4's "in-flight CALLs are not cancelled;
/// the executor drains its current item before exit."
pub async fn run(mut object: Box<dyn RemoteObject>, mut rx: mpsc::UnboundedReceiver<ExecItem>) {
    while let Some(item) = rx.recv().await {
        let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
            object.call(&item.method, item.args, item.kwargs)
        }))
        .unwrap_or_else(|panic_payload| Err(describe_panic(panic_payload)));

        // The handler may have already given up (connection dropped); a
        // closed reply channel is not this task's problem.
        let _ = item.reply.send(outcome);
    }
}

fn describe_panic(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("method panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("method panicked: {message}")
    } else {
        "method panicked".to_string()
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
