use super::*;
use loopback_core::test_support::CounterObject;
use loopback_core::{FactoryDescriptor, FactoryPayload};
use serde_json::Map;
use serial_test::serial;
use tempfile::tempdir;

inventory::submit! {
    loopback_core::FactoryRegistration {
        import: "daemon-test:Counter",
        factory: |_descriptor| Ok(Box::new(CounterObject::new(0, 1))),
    }
}

fn write_factory_file(path: &Path) {
    let payload = FactoryPayload::new(FactoryDescriptor {
        factory_import: "daemon-test:Counter".to_string(),
        factory_args: vec![],
        factory_kwargs: Map::new(),
    });
    std::fs::write(path, serde_json::to_vec(&payload).unwrap()).unwrap();
}

#[tokio::test]
#[serial]
async fn startup_binds_socket_and_publishes_runtime_metadata() {
    let tmp = tempdir().unwrap();
    std::env::set_var("XDG_RUNTIME_DIR", tmp.path());
    #[cfg(unix)]
    std::fs::set_permissions(tmp.path(), std::fs::Permissions::from_mode(0o700)).unwrap();

    let args = DaemonArgs {
        name: "startup-test".to_string(),
        factory_file: tmp.path().join("factory.bin"),
        idle_ttl: Duration::from_secs(30),
        codec_name: "json".to_string(),
        scope: "user".to_string(),
    };
    write_factory_file(&args.factory_file);
    let config = Config::load(&args).unwrap();

    // The daemon fails fast without a pre-existing auth token.
    let missing_token = startup(config.clone()).await;
    assert!(matches!(missing_token, Err(LifecycleError::AuthTokenMissing)));

    loopback_core::ensure_auth_token(&config.paths).unwrap();
    let result = startup(config.clone()).await.unwrap();
    let local_addr = result.listener.local_addr().unwrap();
    assert_eq!(local_addr.ip().to_string(), "127.0.0.1");

    let record = read_runtime(&config.paths).unwrap();
    assert_eq!(record.port, local_addr.port());
    assert_eq!(record.pid, std::process::id());

    std::env::remove_var("XDG_RUNTIME_DIR");
}

#[test]
fn config_load_rejects_an_unsupported_codec_name_up_front() {
    let args = DaemonArgs {
        name: "codec-rejection-test".to_string(),
        factory_file: PathBuf::from("/tmp/does-not-matter/factory.bin"),
        idle_ttl: Duration::from_secs(30),
        codec_name: "yaml".to_string(),
        scope: "user".to_string(),
    };
    let err = Config::load(&args).unwrap_err();
    assert!(matches!(err, LifecycleError::Protocol(_)));
}

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

#[tokio::test]
#[serial]
async fn startup_fails_when_factory_import_is_unregistered() {
    let tmp = tempdir().unwrap();
    std::env::set_var("XDG_RUNTIME_DIR", tmp.path());
    #[cfg(unix)]
    std::fs::set_permissions(tmp.path(), std::fs::Permissions::from_mode(0o700)).unwrap();

    let args = DaemonArgs {
        name: "unregistered-test".to_string(),
        factory_file: tmp.path().join("factory.bin"),
        idle_ttl: Duration::from_secs(30),
        codec_name: "json".to_string(),
        scope: "user".to_string(),
    };
    let payload = FactoryPayload::new(FactoryDescriptor {
        factory_import: "nobody:registered".to_string(),
        factory_args: vec![],
        factory_kwargs: Map::new(),
    });
    std::fs::write(&args.factory_file, serde_json::to_vec(&payload).unwrap()).unwrap();

    let config = Config::load(&args).unwrap();
    loopback_core::ensure_auth_token(&config.paths).unwrap();

    let err = startup(config).await.unwrap_err();
    assert!(matches!(err, LifecycleError::FactoryNotRegistered(ref s) if s == "nobody:registered"));

    std::env::remove_var("XDG_RUNTIME_DIR");
}
