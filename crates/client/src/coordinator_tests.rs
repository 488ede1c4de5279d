use super::*;
use loopback_core::{write_frame, FactoryDescriptor, RuntimeMetadata};
use serde_json::{json, Map};
use tempfile::tempdir;
use tokio::net::TcpListener;

fn paths_in(dir: &std::path::Path) -> RuntimePaths {
    let base = dir.join("loopback-singleton").join("demo");
    RuntimePaths {
        runtime_file: base.join("runtime.bin"),
        auth_file: base.join("auth.bin"),
        lock_file: base.join("lockfile.lock"),
        factory_file: base.join("factory.bin"),
        base_dir: base,
    }
}

fn factory() -> FactoryDescriptor {
    FactoryDescriptor {
        factory_import: "demo:Counter".to_string(),
        factory_args: vec![],
        factory_kwargs: Map::new(),
    }
}

/// A one-shot fake daemon: accepts a single connection, handshakes, and
/// answers one `CALL` with a fixed value.
async fn start_fake_daemon(pid: u32) -> std::net::SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        loop {
            let bytes = match loopback_core::read_frame(&mut stream).await {
                Ok(bytes) => bytes,
                Err(_) => return,
            };
            let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
            let request = Request::from_value(value).unwrap();
            let reply = match request {
                Request::Hello { .. } => Reply::ok(vec![]),
                Request::Ping => Reply::ok(vec![json!({"pid": pid, "active": 1})]),
                Request::Call { .. } => Reply::ok(vec![json!(42)]),
                Request::Shutdown { .. } => Reply::ok(vec![]),
            };
            let encoded = serde_json::to_vec(&reply).unwrap();
            if write_frame(&mut stream, &encoded).await.is_err() {
                return;
            }
        }
    });
    addr
}

#[tokio::test]
async fn connect_once_succeeds_against_a_matching_daemon() {
    let dir = tempdir().unwrap();
    let paths = paths_in(dir.path());
    let addr = start_fake_daemon(777).await;

    let record = RuntimeMetadata {
        protocol_version: loopback_core::PROTOCOL_VERSION,
        host: addr.ip().to_string(),
        port: addr.port(),
        pid: 777,
        codec_name: "json".to_string(),
        started_at: 0.0,
        factory_id: Some(factory().factory_id()),
    };
    loopback_core::write_runtime(&paths, &record).unwrap();

    let proxy = connect_once(&paths, "irrelevant-token", &factory().factory_id(), Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(proxy.pid(), 777);
}

#[tokio::test]
async fn connect_once_rejects_factory_mismatch_without_connecting() {
    let dir = tempdir().unwrap();
    let paths = paths_in(dir.path());

    let record = RuntimeMetadata {
        protocol_version: loopback_core::PROTOCOL_VERSION,
        host: "127.0.0.1".to_string(),
        port: 1, // deliberately unreachable: a real mismatch never dials out
        pid: 1,
        codec_name: "json".to_string(),
        started_at: 0.0,
        factory_id: Some("deadbeefcafef00d".to_string()),
    };
    loopback_core::write_runtime(&paths, &record).unwrap();

    let err = connect_once(&paths, "token", &factory().factory_id(), Duration::from_secs(1))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::FactoryMismatch));
}

#[tokio::test]
async fn connect_once_fails_when_no_runtime_metadata_exists() {
    let dir = tempdir().unwrap();
    let paths = paths_in(dir.path());

    let err = connect_once(&paths, "token", &factory().factory_id(), Duration::from_secs(1))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ClientError::Connection(DaemonConnectionError::ConnectionFailed(_))
    ));
}

#[tokio::test]
async fn try_connect_treats_unreachable_port_as_none_not_error() {
    let dir = tempdir().unwrap();
    let paths = paths_in(dir.path());
    let record = RuntimeMetadata {
        protocol_version: loopback_core::PROTOCOL_VERSION,
        host: "127.0.0.1".to_string(),
        port: 1,
        pid: 1,
        codec_name: "json".to_string(),
        started_at: 0.0,
        factory_id: Some(factory().factory_id()),
    };
    loopback_core::write_runtime(&paths, &record).unwrap();

    let descriptor = ServiceDescriptor::new("demo", factory()).with_connect_timeout(Duration::from_millis(200));
    let result = try_connect(&paths, "token", &factory().factory_id(), &descriptor)
        .await
        .unwrap();
    assert!(result.is_none());
}
