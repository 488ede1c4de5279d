//! Shared wire protocol, runtime-directory, and factory-identity primitives
//! for the loopback singleton service. Used by both [`loopback-daemon`] and
//! [`loopback-client`]; neither crate depends on the other.
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod codec;
pub mod error;
pub mod factory;
pub mod frame;
pub mod lock;
pub mod message;
pub mod registry;
pub mod runtime_dir;
pub mod version;

pub use codec::{get_codec, Codec, JsonCodec};
pub use error::{DaemonConnectionError, LoopbackSingletonError, ProtocolError};
pub use factory::{FactoryDescriptor, FactoryPayload};
pub use frame::{read_frame, read_frame_timeout, write_frame, MAX_FRAME_BYTES};
pub use lock::StartupLock;
pub use message::{Reply, Request, UnknownMessage};
pub use registry::{lookup_factory, FactoryFn, FactoryRegistration, RemoteObject};
pub use runtime_dir::{
    ensure_auth_token, read_factory_payload, read_runtime, remove_runtime, write_factory_payload,
    write_runtime, RuntimeMetadata, RuntimePaths,
};
pub use version::PROTOCOL_VERSION;

#[cfg(feature = "test-support")]
pub mod test_support;
