//! The client-side proxy (§4.5 "Proxy object"): a handle bound to one
//! authenticated socket, exposing remote-method invocation, `PING`, and
//! `SHUTDOWN`.
//!
//! All socket I/O is serialized behind a `tokio::sync::Mutex` so concurrent
//! callers sharing one `Proxy` (it is `Clone`, cheaply, via `Arc`) cannot
//! interleave frames on the wire. Two overlapping `CALL`s would otherwise
//! race to read each other's reply.

use std::sync::Arc;

use serde_json::{json, Map, Value};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use loopback_core::{read_frame, write_frame, ProtocolError, Reply, Request};

use crate::error::ClientError;

struct Inner {
    stream: Mutex<Option<TcpStream>>,
    pid: u32,
    codec_name: String,
}

/// An open, authenticated session with a running daemon. Cloning a `Proxy`
/// shares the same underlying socket and close state (§4.5: "Scoped
/// lifetime: closing is idempotent").
#[derive(Clone)]
pub struct Proxy {
    inner: Arc<Inner>,
}

impl Proxy {
    pub(crate) fn new(stream: TcpStream, pid: u32, codec_name: String) -> Proxy {
        Proxy {
            inner: Arc::new(Inner {
                stream: Mutex::new(Some(stream)),
                pid,
                codec_name,
            }),
        }
    }

    /// The daemon's process id, as reported at handshake time.
    pub fn pid(&self) -> u32 {
        self.inner.pid
    }

    pub fn codec_name(&self) -> &str {
        &self.inner.codec_name
    }

    /// Invoke a remote method by name. Names beginning with `_` are rejected
    /// locally without a round trip. The server would reject them anyway
    /// (§4.4), but there is no reason to pay for the network hop.
    pub async fn call(
        &self,
        method: &str,
        args: Vec<Value>,
        kwargs: Map<String, Value>,
    ) -> Result<Value, ClientError> {
        if method.starts_with('_') {
            return Err(ClientError::Remote(
                "private methods are not allowed".to_string(),
            ));
        }

        let request = Request::Call {
            method: method.to_string(),
            args,
            kwargs,
        };
        match self.exchange(&request).await? {
            Reply::Ok(mut fields) if !fields.is_empty() => Ok(fields.remove(0)),
            Reply::Ok(_) => Ok(Value::Null),
            Reply::Err(message) => Err(ClientError::Remote(message)),
        }
    }

    /// `PING`: returns the daemon's reported pid and active-connection
    /// count as a raw JSON object, per the reply shape in §4.4's table.
    pub async fn ping_daemon(&self) -> Result<Value, ClientError> {
        match self.exchange(&Request::Ping).await? {
            Reply::Ok(mut fields) if !fields.is_empty() => Ok(fields.remove(0)),
            Reply::Ok(_) => Ok(Value::Null),
            Reply::Err(message) => Err(ClientError::Remote(message)),
        }
    }

    /// `SHUTDOWN`: requests the daemon tear itself down. `force` is carried
    /// on the wire but does not change daemon-side handling of in-flight
    /// calls. It is retained purely as a client-side hint for how hard the
    /// caller should wait afterward (see
    /// [`crate::service::LocalSingleton::shutdown`]).
    pub async fn shutdown_daemon(&self, force: bool) -> Result<(), ClientError> {
        match self.exchange(&Request::Shutdown { force }).await? {
            Reply::Ok(_) => Ok(()),
            Reply::Err(message) => Err(ClientError::Remote(message)),
        }
    }

    async fn exchange(&self, request: &Request) -> Result<Reply, ClientError> {
        let mut guard = self.inner.stream.lock().await;
        let stream = guard.as_mut().ok_or(ClientError::ProxyClosed)?;

        let encoded =
            serde_json::to_vec(request).map_err(|e| ProtocolError::Codec(e.to_string()))?;
        if let Err(e) = write_frame(stream, &encoded).await {
            *guard = None;
            return Err(e.into());
        }
        let bytes = match read_frame(stream).await {
            Ok(bytes) => bytes,
            Err(e) => {
                *guard = None;
                return Err(e.into());
            }
        };
        let reply: Reply = serde_json::from_slice(&bytes)
            .map_err(|e| ProtocolError::Codec(e.to_string()))?;
        Ok(reply)
    }

    /// Close the underlying socket. Idempotent: closing an already-closed
    /// proxy is a no-op, not an error (§4.5).
    pub async fn close(&self) {
        let mut guard = self.inner.stream.lock().await;
        guard.take();
    }

    /// `true` once [`Proxy::close`] has run (or the socket errored and was
    /// torn down internally).
    pub async fn is_closed(&self) -> bool {
        self.inner.stream.lock().await.is_none()
    }
}

/// Informational reply shape of [`Proxy::ping_daemon`], matching §4.4's
/// `("OK", {"pid": ..., "active": ...})`.
pub fn ping_fields(pid: u32, active: u32) -> Value {
    json!({"pid": pid, "active": active})
}

#[cfg(test)]
#[path = "proxy_tests.rs"]
mod tests;
