//! Idle-shutdown watchdog (§4.4 "Idle shutdown state machine").
//!
//! Polls at a fixed interval and only ever requests shutdown once a first
//! client has been seen. This is the "startup grace" that stops a
//! freshly-spawned daemon from tearing itself down before anyone arrives.

use std::sync::Arc;
use std::time::Duration;

use crate::state::DaemonShared;

pub async fn run(shared: Arc<DaemonShared>, idle_ttl: Duration, poll_interval: Duration) {
    let mut ticker = tokio::time::interval(poll_interval);
    loop {
        ticker.tick().await;
        if shared.is_shutdown_requested() {
            return;
        }
        if shared.is_idle_expired(idle_ttl) {
            shared.request_shutdown();
            return;
        }
    }
}

#[cfg(test)]
#[path = "watchdog_tests.rs"]
mod tests;
