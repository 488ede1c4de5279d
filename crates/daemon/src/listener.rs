//! Accept loop and per-connection handler (§4.4 "Handler loop (per
//! connection)", §5 concurrency model).

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;

use loopback_core::{read_frame, read_frame_timeout, write_frame, ProtocolError, Reply, Request};

use crate::env;
use crate::executor::ExecItem;
use crate::state::DaemonShared;

/// Run the accept loop until a shutdown is requested. Each accepted
/// connection gets its own handler task; the loop itself never blocks
/// longer than `accept_timeout` so it can notice `shared.shutdown`.
///
/// Returns only after every handler task spawned during the loop has
/// finished, so the caller's own post-shutdown cleanup (removing
/// `runtime.bin`, dropping `exec_tx`) cannot race an in-flight `CALL` that
/// is still waiting on the executor (§4.4: "in-flight CALLs are not
/// cancelled; the executor drains its current item before exit").
pub async fn run(
    listener: TcpListener,
    shared: Arc<DaemonShared>,
    exec_tx: mpsc::UnboundedSender<ExecItem>,
) {
    let accept_timeout = env::accept_timeout();
    let poll_interval = env::watchdog_interval();
    let mut handlers = JoinSet::new();

    loop {
        if shared.is_shutdown_requested() {
            break;
        }
        match tokio::time::timeout(accept_timeout, listener.accept()).await {
            Ok(Ok((stream, _addr))) => {
                let shared = Arc::clone(&shared);
                let exec_tx = exec_tx.clone();
                handlers.spawn(async move {
                    handle_connection(stream, shared, exec_tx, poll_interval).await;
                });
            }
            Ok(Err(_io_error)) => continue,
            Err(_elapsed) => continue,
        }
    }

    while handlers.join_next().await.is_some() {}
}

async fn handle_connection(
    mut stream: TcpStream,
    shared: Arc<DaemonShared>,
    exec_tx: mpsc::UnboundedSender<ExecItem>,
    poll_interval: Duration,
) {
    shared.adjust_active_connections(1);

    let outcome = run_handshake(&mut stream, &shared).await;
    match outcome {
        Ok(true) => {
            shared.mark_ever_connected();
            serve_messages(&mut stream, &shared, &exec_tx, poll_interval).await;
        }
        Ok(false) | Err(_) => {
            // Handshake failed or the stream errored before it completed;
            // the reply (if any) was already sent by `run_handshake`.
        }
    }

    shared.adjust_active_connections(-1);
}

/// Receive one `HELLO`, reply, and report whether it succeeded. A
/// transport error is distinct from an authenticated-but-rejected
/// handshake, but both end the connection.
async fn run_handshake(
    stream: &mut TcpStream,
    shared: &DaemonShared,
) -> Result<bool, ProtocolError> {
    let bytes = read_frame(stream).await?;
    let value: Value = serde_json::from_slice(&bytes).map_err(|e| ProtocolError::Codec(e.to_string()))?;
    let request = match Request::from_value(value) {
        Ok(req) => req,
        Err(unknown) => {
            reply(stream, &Reply::err(unknown.0)).await?;
            return Ok(false);
        }
    };

    let (proto_version, auth_token) = match request {
        Request::Hello {
            proto_version,
            auth_token,
        } => (proto_version, auth_token),
        _ => {
            reply(stream, &Reply::err("expected HELLO")).await?;
            return Ok(false);
        }
    };

    if proto_version != loopback_core::PROTOCOL_VERSION || auth_token != shared.auth_token {
        reply(stream, &Reply::err("handshake failed")).await?;
        return Ok(false);
    }

    reply(
        stream,
        &Reply::ok(vec![json!(shared.pid), json!({"codec": shared.codec_name})]),
    )
    .await?;
    Ok(true)
}

/// The post-handshake dispatch loop. Uses the non-consuming, timeout-aware
/// receive so the handler can notice a daemon-wide shutdown between
/// messages without risking losing bytes belonging to the next frame.
async fn serve_messages(
    stream: &mut TcpStream,
    shared: &DaemonShared,
    exec_tx: &mpsc::UnboundedSender<ExecItem>,
    poll_interval: Duration,
) {
    loop {
        if shared.is_shutdown_requested() {
            return;
        }

        let bytes = match read_frame_timeout(stream, poll_interval).await {
            Ok(bytes) => bytes,
            Err(ProtocolError::Timeout) => continue,
            Err(_) => return,
        };

        let value: Value = match serde_json::from_slice(&bytes) {
            Ok(v) => v,
            Err(e) => {
                if reply(stream, &Reply::err(format!("codec error: {e}"))).await.is_err() {
                    return;
                }
                continue;
            }
        };

        let request = match Request::from_value(value) {
            Ok(req) => req,
            Err(unknown) => {
                if reply(stream, &Reply::err(unknown.0)).await.is_err() {
                    return;
                }
                continue;
            }
        };

        let should_close = match request {
            Request::Hello { .. } => {
                reply(stream, &Reply::err("unexpected HELLO on an established connection"))
                    .await
                    .is_err()
            }
            Request::Ping => reply(
                stream,
                &Reply::ok(vec![json!({
                    "pid": shared.pid,
                    "active": shared.active_connections(),
                })]),
            )
            .await
            .is_err(),
            Request::Call {
                method,
                args,
                kwargs,
            } => dispatch_call(stream, exec_tx, method, args, kwargs).await,
            Request::Shutdown { .. } => {
                shared.request_shutdown();
                reply(stream, &Reply::ok(vec![json!({"shutdown": true})]))
                    .await
                    .ok();
                true
            }
        };

        if should_close {
            return;
        }
    }
}

async fn dispatch_call(
    stream: &mut TcpStream,
    exec_tx: &mpsc::UnboundedSender<ExecItem>,
    method: String,
    args: Vec<Value>,
    kwargs: serde_json::Map<String, Value>,
) -> bool {
    if method.starts_with('_') {
        return reply(stream, &Reply::err("private methods are not allowed"))
            .await
            .is_err();
    }

    let (reply_tx, reply_rx) = oneshot::channel();
    if exec_tx
        .send(ExecItem {
            method,
            args,
            kwargs,
            reply: reply_tx,
        })
        .is_err()
    {
        // Executor is gone (daemon tearing down); best effort notify.
        return reply(stream, &Reply::err("daemon is shutting down"))
            .await
            .is_err();
    }

    let outcome = match reply_rx.await {
        Ok(outcome) => outcome,
        Err(_) => Err("executor dropped the reply channel".to_string()),
    };

    let wire_reply = match outcome {
        Ok(value) => Reply::ok(vec![value]),
        Err(message) => Reply::err(message),
    };
    reply(stream, &wire_reply).await.is_err()
}

async fn reply(stream: &mut TcpStream, message: &Reply) -> Result<(), ProtocolError> {
    let encoded = serde_json::to_vec(message).map_err(|e| ProtocolError::Codec(e.to_string()))?;
    write_frame(stream, &encoded).await
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
