//! Black-box behavioral specifications for the loopback singleton service,
//! run against the real `loopback-demo-daemon` binary and the
//! `loopback-client` coordinator, end to end.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::{json, Map};
use serial_test::serial;
use tempfile::TempDir;

use loopback_client::{connect_or_spawn, ClientError, LocalSingleton, ServiceDescriptor};
use loopback_core::{read_runtime, FactoryDescriptor, RuntimePaths};

/// Resolves the demo daemon binary the same way the daemon-spawn path
/// resolves `loopbackd` itself: manifest-relative `target/debug` first,
/// falling back to a path next to the test binary (the test binary lives at
/// `target/debug/deps/specs-<hash>`, so its grandparent is `target/debug/`).
fn demo_daemon_binary() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let standard = manifest_dir.join("target/debug/loopback-demo-daemon");
    if standard.exists() {
        return standard;
    }
    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let fallback = debug_dir.join("loopback-demo-daemon");
            if fallback.exists() {
                return fallback;
            }
        }
    }
    standard
}

/// Point the client's runtime-directory resolution and daemon-binary
/// discovery at an isolated, per-test sandbox. Held for the lifetime of one
/// test; dropped to clean up the directory.
struct Sandbox {
    _dir: TempDir,
}

impl Sandbox {
    fn new() -> Sandbox {
        let dir = tempfile::tempdir().unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(dir.path(), std::fs::Permissions::from_mode(0o700)).unwrap();
        }
        std::env::set_var("XDG_RUNTIME_DIR", dir.path());
        std::env::set_var("LOOPBACK_DAEMON_BINARY", demo_daemon_binary());
        Sandbox { _dir: dir }
    }
}

impl Drop for Sandbox {
    fn drop(&mut self) {
        std::env::remove_var("XDG_RUNTIME_DIR");
        std::env::remove_var("LOOPBACK_DAEMON_BINARY");
    }
}

fn counter_factory(start: i64, step: i64) -> FactoryDescriptor {
    FactoryDescriptor {
        factory_import: "demo:Counter".to_string(),
        factory_args: vec![json!(start), json!(step)],
        factory_kwargs: Map::new(),
    }
}

fn runtime_paths(descriptor: &ServiceDescriptor) -> RuntimePaths {
    RuntimePaths::for_name(&descriptor.name, &descriptor.scope).unwrap()
}

#[tokio::test]
#[serial]
async fn twelve_concurrent_spawners_converge_on_one_daemon() {
    let _sandbox = Sandbox::new();
    let descriptor = ServiceDescriptor::new("race-start", counter_factory(0, 1))
        .with_start_timeout(Duration::from_secs(10));

    let mut handles = Vec::new();
    for _ in 0..12 {
        let descriptor = descriptor.clone();
        handles.push(tokio::spawn(async move { connect_or_spawn(&descriptor).await }));
    }

    let mut pids = std::collections::HashSet::new();
    for handle in handles {
        let proxy = handle.await.unwrap().unwrap();
        pids.insert(proxy.pid());
    }
    assert_eq!(pids.len(), 1, "exactly one daemon process should have been spawned");

    let singleton = LocalSingleton::new(descriptor);
    singleton.shutdown(true).await.unwrap();
}

#[tokio::test]
#[serial]
async fn eight_tasks_times_eight_calls_serialize_exactly() {
    let _sandbox = Sandbox::new();
    let descriptor = ServiceDescriptor::new("strict-serialization", counter_factory(0, 1))
        .with_start_timeout(Duration::from_secs(10));

    let singleton = std::sync::Arc::new(LocalSingleton::new(descriptor.clone()));
    singleton.ensure_started().await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let singleton = std::sync::Arc::clone(&singleton);
        handles.push(tokio::spawn(async move {
            for _ in 0..8 {
                singleton.call("inc", vec![], Map::new()).await.unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let result = singleton.call("get", vec![], Map::new()).await.unwrap();
    similar_asserts::assert_eq!(result, json!(64));

    singleton.shutdown(true).await.unwrap();
}

#[tokio::test]
#[serial]
async fn daemon_restarts_with_a_new_pid_after_going_idle() {
    let _sandbox = Sandbox::new();
    let descriptor = ServiceDescriptor::new("idle-restart", counter_factory(0, 1))
        .with_idle_ttl(Duration::from_millis(300))
        .with_start_timeout(Duration::from_secs(10));

    let first = connect_or_spawn(&descriptor).await.unwrap();
    let first_pid = first.pid();
    first.close().await;

    let paths = runtime_paths(&descriptor);
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while read_runtime(&paths).is_some() {
        assert!(std::time::Instant::now() < deadline, "daemon never went idle");
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    let second = connect_or_spawn(&descriptor).await.unwrap();
    assert_ne!(first_pid, second.pid());

    let singleton = LocalSingleton::new(descriptor);
    singleton.shutdown(true).await.unwrap();
}

#[tokio::test]
#[serial]
async fn stale_runtime_metadata_is_replaced_by_a_fresh_daemon() {
    let _sandbox = Sandbox::new();
    let descriptor = ServiceDescriptor::new("stale-metadata", counter_factory(0, 1))
        .with_start_timeout(Duration::from_secs(10));
    let paths = runtime_paths(&descriptor);

    loopback_core::ensure_auth_token(&paths).unwrap();
    let stale = loopback_core::RuntimeMetadata {
        protocol_version: loopback_core::PROTOCOL_VERSION,
        host: "127.0.0.1".to_string(),
        port: 1, // unreachable: simulates a daemon that died without cleanup
        pid: 999999,
        codec_name: "json".to_string(),
        started_at: 0.0,
        factory_id: Some(descriptor.factory.factory_id()),
    };
    loopback_core::write_runtime(&paths, &stale).unwrap();

    let proxy = connect_or_spawn(&descriptor).await.unwrap();
    assert_ne!(proxy.pid(), 999999);

    let singleton = LocalSingleton::new(descriptor);
    singleton.shutdown(true).await.unwrap();
}

#[tokio::test]
#[serial]
async fn a_remote_panic_path_round_trips_as_a_client_error() {
    let _sandbox = Sandbox::new();
    let descriptor = ServiceDescriptor::new("remote-error", counter_factory(0, 1))
        .with_start_timeout(Duration::from_secs(10));
    let singleton = LocalSingleton::new(descriptor);

    let err = singleton.call("fail", vec![], Map::new()).await.unwrap_err();
    match err {
        ClientError::Remote(message) => {
            assert!(message.contains("RuntimeError"));
            assert!(message.contains("boom"));
        }
        other => panic!("expected a Remote error, got {other:?}"),
    }

    // The connection survives a remote-level error; a normal call still works.
    let value = singleton.call("get", vec![], Map::new()).await.unwrap();
    assert_eq!(value, json!(0));

    singleton.shutdown(true).await.unwrap();
}

#[tokio::test]
#[serial]
async fn an_oversized_call_is_rejected_locally_without_harming_the_daemon() {
    let _sandbox = Sandbox::new();
    let descriptor = ServiceDescriptor::new("oversized-frame", counter_factory(0, 1))
        .with_start_timeout(Duration::from_secs(10));
    let singleton = LocalSingleton::new(descriptor);

    let first_pid = singleton.proxy().await.unwrap().pid();

    // One argument alone larger than the 16 MiB frame cap.
    let huge = json!("x".repeat(20 * 1024 * 1024));
    let err = singleton
        .call("inc", vec![huge], Map::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Protocol(_)));

    // The daemon process itself is untouched; a fresh session reaches the
    // same pid and the counter is unaffected by the rejected call.
    let second_pid = singleton.proxy().await.unwrap().pid();
    assert_eq!(first_pid, second_pid);
    let value = singleton.call("get", vec![], Map::new()).await.unwrap();
    assert_eq!(value, json!(0));

    singleton.shutdown(true).await.unwrap();
}

#[tokio::test]
#[serial]
async fn a_factory_mismatch_is_rejected_immediately_without_spawning() {
    let _sandbox = Sandbox::new();
    let original = ServiceDescriptor::new("factory-mismatch", counter_factory(0, 1))
        .with_start_timeout(Duration::from_secs(10));
    connect_or_spawn(&original).await.unwrap();

    let mismatched = ServiceDescriptor::new("factory-mismatch", counter_factory(0, 2))
        .with_start_timeout(Duration::from_secs(10));
    let err = connect_or_spawn(&mismatched).await.unwrap_err();
    assert!(matches!(err, ClientError::FactoryMismatch));

    let singleton = LocalSingleton::new(original);
    singleton.shutdown(true).await.unwrap();
}
