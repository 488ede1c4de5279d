//! Centralized environment-variable accessors: one flat function per
//! variable, each documenting its own default and parse-failure behavior.

use std::time::Duration;

fn parse_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// How long the accept loop blocks per iteration before re-checking the
/// shutdown signal (§4.4 item 4: "~200ms"). `LOOPBACK_ACCEPT_TIMEOUT_MS`.
pub fn accept_timeout() -> Duration {
    parse_ms("LOOPBACK_ACCEPT_TIMEOUT_MS").unwrap_or(Duration::from_millis(200))
}

/// Watchdog poll granularity (§4.4: "polls at ~200ms granularity") and also
/// the per-connection handler's non-consuming receive timeout, so a handler
/// notices a daemon-wide shutdown at roughly the same cadence the watchdog
/// decides on one. `LOOPBACK_WATCHDOG_INTERVAL_MS`.
pub fn watchdog_interval() -> Duration {
    parse_ms("LOOPBACK_WATCHDOG_INTERVAL_MS").unwrap_or(Duration::from_millis(200))
}

/// Override for the idle TTL passed on the command line, primarily useful
/// for tests that want a faster idle-restart cycle than `--idle-ttl` alone
/// without touching process arguments. `LOOPBACK_IDLE_TTL_MS`.
pub fn idle_ttl_override() -> Option<Duration> {
    parse_ms("LOOPBACK_IDLE_TTL_MS")
}

/// `tracing_subscriber::EnvFilter` directive string. `LOOPBACK_LOG`.
pub fn log_filter() -> String {
    std::env::var("LOOPBACK_LOG").unwrap_or_else(|_| "info".to_string())
}

/// Log file rotation threshold in bytes, 10 MiB default.
/// `LOOPBACK_LOG_MAX_BYTES`.
pub fn log_max_bytes() -> u64 {
    std::env::var("LOOPBACK_LOG_MAX_BYTES")
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(10 * 1024 * 1024)
}

/// Number of rotated log files to retain. `LOOPBACK_LOG_ROTATIONS`.
pub fn log_rotations() -> u32 {
    std::env::var("LOOPBACK_LOG_ROTATIONS")
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(3)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
