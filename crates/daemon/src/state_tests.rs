use super::*;
use std::time::Duration;

#[test]
fn idle_is_not_expired_before_first_connection() {
    let shared = DaemonShared::new(1, "token".to_string(), "json".to_string());
    assert!(!shared.is_idle_expired(Duration::from_millis(0)));
}

#[test]
fn idle_expires_after_ttl_once_count_returns_to_zero() {
    let shared = DaemonShared::new(1, "token".to_string(), "json".to_string());
    shared.adjust_active_connections(1);
    shared.mark_ever_connected();
    shared.adjust_active_connections(-1);
    assert_eq!(shared.active_connections(), 0);

    std::thread::sleep(Duration::from_millis(20));
    assert!(shared.is_idle_expired(Duration::from_millis(10)));
    assert!(!shared.is_idle_expired(Duration::from_secs(60)));
}

#[test]
fn new_handshake_resets_idle_window() {
    let shared = DaemonShared::new(1, "token".to_string(), "json".to_string());
    shared.adjust_active_connections(1);
    shared.mark_ever_connected();
    shared.adjust_active_connections(-1);
    shared.adjust_active_connections(1);
    assert_eq!(shared.active_connections(), 1);
    assert!(!shared.is_idle_expired(Duration::from_millis(0)));
}

#[test]
fn request_shutdown_is_observable() {
    let shared = DaemonShared::new(1, "token".to_string(), "json".to_string());
    assert!(!shared.is_shutdown_requested());
    shared.request_shutdown();
    assert!(shared.is_shutdown_requested());
}
