//! Service descriptor: the client-side, immutable description of which
//! singleton to reach (§3). Everything needed to either find a live daemon
//! or spawn one lives here.

use std::time::Duration;

use loopback_core::{get_codec, FactoryDescriptor};

use crate::error::ClientError;

/// Default idle TTL: 10 minutes, a generous default for a local developer
/// tool where "is anyone still using this" matters more than reclaiming a
/// few megabytes promptly.
pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(600);
/// Default TCP connect timeout for an existing daemon.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default bound on how long `connect_or_spawn` waits for a freshly spawned
/// daemon to become reachable before giving up.
pub const DEFAULT_START_TIMEOUT: Duration = Duration::from_secs(10);

/// The client-side, immutable description of a named singleton service
/// (§3). `scope` is carried rather than hard-coded so a future multi-scope
/// daemon only needs a new variant here, not a new code path.
#[derive(Debug, Clone)]
pub struct ServiceDescriptor {
    pub name: String,
    pub factory: FactoryDescriptor,
    pub idle_ttl: Duration,
    pub codec_name: String,
    pub scope: String,
    pub connect_timeout: Duration,
    pub start_timeout: Duration,
}

impl ServiceDescriptor {
    /// A descriptor with every spec-required default: 10 minute idle TTL,
    /// the `"json"` codec, `"user"` scope, 5s connect / 10s start timeouts.
    pub fn new(name: impl Into<String>, factory: FactoryDescriptor) -> ServiceDescriptor {
        ServiceDescriptor {
            name: name.into(),
            factory,
            idle_ttl: DEFAULT_IDLE_TTL,
            codec_name: "json".to_string(),
            scope: "user".to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            start_timeout: DEFAULT_START_TIMEOUT,
        }
    }

    pub fn with_idle_ttl(mut self, idle_ttl: Duration) -> ServiceDescriptor {
        self.idle_ttl = idle_ttl;
        self
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> ServiceDescriptor {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn with_start_timeout(mut self, start_timeout: Duration) -> ServiceDescriptor {
        self.start_timeout = start_timeout;
        self
    }

    /// Request a non-default wire codec. Validated immediately against
    /// [`loopback_core::get_codec`] so an unsupported name is a
    /// configuration error surfaced up front, rather than discovered only
    /// once a connection or spawn is attempted (§3).
    pub fn with_codec_name(mut self, codec_name: impl Into<String>) -> Result<ServiceDescriptor, ClientError> {
        let codec_name = codec_name.into();
        get_codec(&codec_name)?;
        self.codec_name = codec_name;
        Ok(self)
    }
}

#[cfg(test)]
#[path = "descriptor_tests.rs"]
mod tests;
