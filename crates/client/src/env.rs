//! Centralized environment-variable accessors for the client coordinator:
//! one flat function per variable, each with a documented default.

use std::time::Duration;

fn parse_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Polling interval while waiting for a spawned daemon to become reachable
/// (§4.5 step 3e: "~50ms"). `LOOPBACK_CONNECT_POLL_MS`.
pub fn connect_poll_interval() -> Duration {
    parse_ms("LOOPBACK_CONNECT_POLL_MS").unwrap_or(Duration::from_millis(50))
}

/// Override for locating the daemon binary. Lets tests point the client at
/// a purpose-built demo daemon binary without installing anything.
/// `LOOPBACK_DAEMON_BINARY`.
pub fn daemon_binary_override() -> Option<String> {
    std::env::var("LOOPBACK_DAEMON_BINARY").ok()
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
