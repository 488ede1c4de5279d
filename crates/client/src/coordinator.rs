//! The discover-or-spawn coordinator (§4.5): the client-side double-checked
//! locking dance that finds a live daemon or starts exactly one, even under
//! concurrent callers racing to be first.

use std::time::{Duration, Instant};

use tokio::net::TcpStream;
use tokio::time::timeout;

use loopback_core::{
    ensure_auth_token, read_factory_payload, read_runtime, remove_runtime, write_factory_payload,
    DaemonConnectionError, FactoryPayload, ProtocolError, Reply, Request, RuntimeMetadata,
    RuntimePaths, StartupLock, PROTOCOL_VERSION,
};

use crate::daemon_process::spawn_detached;
use crate::descriptor::ServiceDescriptor;
use crate::env::connect_poll_interval;
use crate::error::{ClientError, NO_ERROR_DETAILS};
use crate::proxy::Proxy;

/// Try to reach whatever daemon `runtime.bin` currently claims is listening,
/// performing the full handshake (§4.4 step: `HELLO` → `OK`/`ERR`). A
/// factory-id mismatch is reported distinctly from every other connection
/// failure so callers can decide whether retrying is even useful (it isn't:
/// §4.5 says mismatches propagate immediately, they are never a trigger to
/// spawn a second daemon).
pub async fn connect_once(
    paths: &RuntimePaths,
    auth_token: &str,
    expected_factory_id: &str,
    connect_timeout: Duration,
) -> Result<Proxy, ClientError> {
    let record = read_runtime(paths).ok_or_else(|| {
        ClientError::Connection(DaemonConnectionError::ConnectionFailed(
            "no runtime metadata published".to_string(),
        ))
    })?;

    if let Some(ref running_factory_id) = record.factory_id {
        if running_factory_id != expected_factory_id {
            return Err(ClientError::FactoryMismatch);
        }
    }

    let addr = format!("{}:{}", record.host, record.port);
    let stream = timeout(connect_timeout, TcpStream::connect(&addr))
        .await
        .map_err(|_| {
            ClientError::Connection(DaemonConnectionError::ConnectionFailed(
                "timed out connecting".to_string(),
            ))
        })?
        .map_err(|e| ClientError::Connection(DaemonConnectionError::ConnectionFailed(e.to_string())))?;

    handshake(stream, &record, auth_token).await
}

async fn handshake(
    mut stream: TcpStream,
    record: &RuntimeMetadata,
    auth_token: &str,
) -> Result<Proxy, ClientError> {
    let hello = Request::Hello {
        proto_version: PROTOCOL_VERSION,
        auth_token: auth_token.to_string(),
    };
    let encoded = serde_json::to_vec(&hello).map_err(|e| ProtocolError::Codec(e.to_string()))?;
    loopback_core::write_frame(&mut stream, &encoded)
        .await
        .map_err(ClientError::from)?;
    let bytes = loopback_core::read_frame(&mut stream)
        .await
        .map_err(ClientError::from)?;
    let reply: Reply =
        serde_json::from_slice(&bytes).map_err(|e| ProtocolError::Codec(e.to_string()))?;

    match reply {
        Reply::Ok(_) => Ok(Proxy::new(stream, record.pid, record.codec_name.clone())),
        Reply::Err(message) => Err(ClientError::Connection(DaemonConnectionError::Handshake(
            message,
        ))),
    }
}

/// Find a live daemon for `descriptor`, or start exactly one and wait for it
/// to become reachable (§4.5). Every factory mismatch, at any point in the
/// flow, propagates to the caller immediately rather than being treated as
/// "try spawning again".
pub async fn connect_or_spawn(descriptor: &ServiceDescriptor) -> Result<Proxy, ClientError> {
    let paths = RuntimePaths::for_name(&descriptor.name, &descriptor.scope)?;
    let auth_token = ensure_auth_token(&paths)?;
    let expected_factory_id = descriptor.factory.factory_id();

    if let Some(proxy) = try_connect(&paths, &auth_token, &expected_factory_id, descriptor).await? {
        return Ok(proxy);
    }

    let lock_path = paths.lock_file.clone();
    let _lock = tokio::task::spawn_blocking(move || StartupLock::acquire(&lock_path))
        .await
        .map_err(|e| ClientError::DaemonStartFailed(e.to_string()))??;

    // Re-check now that we hold the startup lock: a sibling process may have
    // already finished spawning while we were waiting for it.
    if let Some(proxy) = try_connect(&paths, &auth_token, &expected_factory_id, descriptor).await? {
        return Ok(proxy);
    }

    remove_runtime(&paths);
    let payload = FactoryPayload::new(descriptor.factory.clone());
    write_factory_payload(&paths, &payload)?;

    let mut child = spawn_detached(descriptor, &paths.factory_file)?;

    let deadline = Instant::now() + descriptor.start_timeout;
    let mut last_error: Option<String> = None;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                return Err(ClientError::DaemonStartFailed(format!(
                    "daemon exited early with {status}"
                )));
            }
            Ok(None) => {}
            Err(e) => {
                return Err(ClientError::DaemonStartFailed(e.to_string()));
            }
        }

        match connect_once(
            &paths,
            &auth_token,
            &expected_factory_id,
            descriptor.connect_timeout,
        )
        .await
        {
            Ok(proxy) => return Ok(proxy),
            Err(ClientError::FactoryMismatch) => return Err(ClientError::FactoryMismatch),
            Err(e) => last_error = Some(e.to_string()),
        }

        if Instant::now() >= deadline {
            return Err(ClientError::DaemonStartTimeout(
                last_error.unwrap_or_else(|| NO_ERROR_DETAILS.to_string()),
            ));
        }
        tokio::time::sleep(connect_poll_interval()).await;
    }
}

/// One connection attempt against whatever metadata is currently on disk,
/// collapsing "nothing published yet" into `Ok(None)` (try spawning) while
/// still surfacing a factory mismatch as an error (never a trigger to spawn).
async fn try_connect(
    paths: &RuntimePaths,
    auth_token: &str,
    expected_factory_id: &str,
    descriptor: &ServiceDescriptor,
) -> Result<Option<Proxy>, ClientError> {
    match connect_once(paths, auth_token, expected_factory_id, descriptor.connect_timeout).await {
        Ok(proxy) => Ok(Some(proxy)),
        Err(ClientError::FactoryMismatch) => Err(ClientError::FactoryMismatch),
        Err(_) => Ok(None),
    }
}

/// Read back the factory payload a daemon was started with, used by tests
/// and diagnostics to confirm what got written to disk.
pub fn read_pending_factory(paths: &RuntimePaths) -> Result<FactoryPayload, ClientError> {
    read_factory_payload(&paths.factory_file).map_err(ClientError::from)
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
