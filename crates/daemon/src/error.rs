//! Daemon-local error taxonomy, layered on top of
//! [`loopback_core::ProtocolError`] (§4.4's ambient error-handling section).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("auth token missing; a client must initialize it before spawning a daemon")]
    AuthTokenMissing,

    #[error("factory payload invalid: {0}")]
    FactoryPayloadInvalid(String),

    #[error("no factory registered for import string: {0}")]
    FactoryNotRegistered(String),

    #[error("factory construction failed: {0}")]
    FactoryConstruction(String),

    #[error("could not determine a runtime base directory")]
    NoStateDir,

    #[error(transparent)]
    Protocol(#[from] loopback_core::ProtocolError),
}
