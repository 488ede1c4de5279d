//! Client-side error taxonomy (§7), layering on top of
//! [`loopback_core::DaemonConnectionError`] / [`ProtocolError`].

use loopback_core::{DaemonConnectionError, ProtocolError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Connection(#[from] DaemonConnectionError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("factory configuration mismatch for running daemon")]
    FactoryMismatch,

    #[error("remote call failed: {0}")]
    Remote(String),

    #[error("failed to start daemon: {0}")]
    DaemonStartFailed(String),

    #[error("timed out waiting for daemon to start: {0}")]
    DaemonStartTimeout(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("could not determine a runtime base directory")]
    NoStateDir,

    #[error("Proxy is closed")]
    ProxyClosed,
}

/// `DaemonConnectionError::ConnectionFailed` text used when no error was
/// ever observed during the start-timeout poll (§4.5 step 3f: "a 'no error
/// details' variant if none was recorded").
pub const NO_ERROR_DETAILS: &str = "no error details";
