use super::*;
use serial_test::serial;

#[test]
fn write_startup_marker_appends_a_greppable_line() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("widgets.log");

    write_startup_marker(&log_path, 4242).unwrap();
    let contents = std::fs::read_to_string(&log_path).unwrap();
    assert!(contents.starts_with(STARTUP_MARKER_PREFIX));
    assert!(contents.contains("4242"));
}

#[test]
fn write_startup_marker_creates_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("nested").join("widgets.log");

    write_startup_marker(&log_path, 1).unwrap();
    assert!(log_path.exists());
}

#[test]
#[serial]
fn rotate_log_if_needed_is_a_no_op_below_the_threshold() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("widgets.log");
    std::fs::write(&log_path, b"small").unwrap();

    std::env::remove_var("LOOPBACK_LOG_MAX_BYTES");
    rotate_log_if_needed(&log_path);

    assert!(log_path.exists());
    assert!(!dir.path().join("widgets.log.1").exists());
}

#[test]
#[serial]
fn rotate_log_if_needed_renames_past_the_threshold() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("widgets.log");
    std::fs::write(&log_path, vec![0u8; 64]).unwrap();

    std::env::set_var("LOOPBACK_LOG_MAX_BYTES", "10");
    rotate_log_if_needed(&log_path);
    std::env::remove_var("LOOPBACK_LOG_MAX_BYTES");

    assert!(!log_path.exists());
    assert!(dir.path().join("widgets.log.1").exists());
}

#[test]
fn rotate_log_if_needed_tolerates_a_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("does-not-exist.log");
    rotate_log_if_needed(&log_path);
}
