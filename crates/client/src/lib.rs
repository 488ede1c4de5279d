//! Client coordinator for the loopback singleton service (§4.5): given a
//! [`ServiceDescriptor`], returns a live authenticated [`Proxy`] to the
//! named daemon, spawning one if none is reachable yet.
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

mod coordinator;
mod daemon_process;
pub mod descriptor;
pub mod env;
pub mod error;
mod proxy;
pub mod service;

pub use coordinator::{connect_once, connect_or_spawn};
pub use daemon_process::find_daemon_binary;
pub use descriptor::ServiceDescriptor;
pub use error::ClientError;
pub use proxy::Proxy;
pub use service::LocalSingleton;
