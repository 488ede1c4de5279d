//! Liveness tracking shared across the accept loop, handlers, and watchdog
//! (§4.4 "Liveness tracking" / "Idle shutdown state machine").

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use parking_lot::Mutex;
use tokio::sync::Notify;

struct Liveness {
    active_connections: u32,
    last_zero_at: Instant,
    ever_connected: bool,
}

/// State shared by every task inside one running daemon. Never held across
/// an `.await` point. Every access is a short, synchronous critical
/// section under `parking_lot::Mutex`, per §5.
pub struct DaemonShared {
    pub pid: u32,
    pub auth_token: String,
    pub codec_name: String,
    liveness: Mutex<Liveness>,
    shutting_down: AtomicBool,
    pub shutdown: Notify,
}

impl DaemonShared {
    pub fn new(pid: u32, auth_token: String, codec_name: String) -> DaemonShared {
        DaemonShared {
            pid,
            auth_token,
            codec_name,
            liveness: Mutex::new(Liveness {
                active_connections: 0,
                last_zero_at: Instant::now(),
                ever_connected: false,
            }),
            shutting_down: AtomicBool::new(false),
            shutdown: Notify::new(),
        }
    }

    /// A handler calls this once on accept and once more on exit, with +1
    /// and -1 respectively.
    pub fn adjust_active_connections(&self, delta: i64) {
        let mut liveness = self.liveness.lock();
        liveness.active_connections = (liveness.active_connections as i64 + delta).max(0) as u32;
        if liveness.active_connections == 0 {
            liveness.last_zero_at = Instant::now();
        }
    }

    pub fn active_connections(&self) -> u32 {
        self.liveness.lock().active_connections
    }

    pub fn mark_ever_connected(&self) {
        self.liveness.lock().ever_connected = true;
    }

    /// The watchdog's own idle-shutdown predicate: only ever true once a
    /// first client has connected (startup grace), only while no connection
    /// is active, and only once `idle_ttl` has elapsed since the count last
    /// hit zero.
    pub fn is_idle_expired(&self, idle_ttl: std::time::Duration) -> bool {
        let liveness = self.liveness.lock();
        liveness.ever_connected
            && liveness.active_connections == 0
            && liveness.last_zero_at.elapsed() >= idle_ttl
    }

    pub fn request_shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
        self.shutdown.notify_waiters();
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
