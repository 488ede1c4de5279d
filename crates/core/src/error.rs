//! Shared error taxonomy for the loopback singleton protocol: a root error,
//! a connection/handshake family, a factory-mismatch error, and a
//! remote-execution error. Daemon- and client-specific errors layer on top
//! of [`ProtocolError`] in their own crates.

use thiserror::Error;

/// Root error for anything that can go wrong talking to a loopback singleton.
#[derive(Debug, Error)]
pub enum LoopbackSingletonError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Connection(#[from] DaemonConnectionError),

    #[error("factory configuration mismatch for running daemon")]
    FactoryMismatch,

    #[error("remote call failed: {0}")]
    Remote(String),
}

/// Wire-frame and message-shape errors.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(String),

    #[error("frame too large: {size} bytes exceeds max {max} bytes")]
    FrameTooLarge { size: u32, max: u32 },

    #[error("connection closed")]
    ConnectionClosed,

    #[error("timed out waiting for a complete frame")]
    Timeout,
}

/// Failure to reach or authenticate with a running daemon.
#[derive(Debug, Error)]
pub enum DaemonConnectionError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("handshake failed: {0}")]
    Handshake(String),
}
