//! The service-level convenience wrapper (§4.5 "Service-level
//! conveniences"): a handle bound to one [`ServiceDescriptor`] that hides the
//! discover-or-spawn dance behind `ensure_started`/`ping`/`call`/`shutdown`.

use std::time::{Duration, Instant};

use serde_json::{Map, Value};
use tokio::sync::Mutex;

use loopback_core::{read_runtime, remove_runtime, RuntimePaths};

use crate::coordinator::{connect_once, connect_or_spawn};
use crate::descriptor::ServiceDescriptor;
use crate::error::ClientError;
use crate::proxy::Proxy;

/// A named singleton, reconnected or respawned on demand. Holds at most one
/// cached [`Proxy`] at a time; a dropped/closed connection is transparently
/// replaced on the next call.
pub struct LocalSingleton {
    descriptor: ServiceDescriptor,
    session: Mutex<Option<Proxy>>,
}

impl LocalSingleton {
    pub fn new(descriptor: ServiceDescriptor) -> LocalSingleton {
        LocalSingleton {
            descriptor,
            session: Mutex::new(None),
        }
    }

    pub fn descriptor(&self) -> &ServiceDescriptor {
        &self.descriptor
    }

    /// Return a live [`Proxy`], reusing the cached session if it is still
    /// open, otherwise running the full discover-or-spawn flow. Reserved for
    /// [`LocalSingleton::call`]; `ensure_started`/`ping` deliberately bypass
    /// this cache (see their doc comments).
    pub async fn proxy(&self) -> Result<Proxy, ClientError> {
        let mut guard = self.session.lock().await;
        if let Some(proxy) = guard.as_ref() {
            if !proxy.is_closed().await {
                return Ok(proxy.clone());
            }
        }
        let proxy = connect_or_spawn(&self.descriptor).await?;
        *guard = Some(proxy.clone());
        Ok(proxy)
    }

    /// Open a session to cause the daemon to start if it has not already,
    /// then close it (§4.5: "opens and closes a session to cause startup").
    /// Deliberately does not go through the cached session in [`Self::proxy`]
    /// so that, absent any other open session, `active_connections` returns
    /// to zero immediately afterward and the idle watchdog can do its job.
    pub async fn ensure_started(&self) -> Result<(), ClientError> {
        let proxy = connect_or_spawn(&self.descriptor).await?;
        proxy.close().await;
        Ok(())
    }

    /// `PING` the daemon, returning its reported pid/active-connection
    /// payload. Opens a fresh session and closes it afterward (§4.5: "opens
    /// a session, sends `PING`, validates the reply shape, closes"), rather
    /// than reusing the cached session, so repeated `ping()` calls do not
    /// keep `active_connections` pinned above zero forever.
    pub async fn ping(&self) -> Result<Value, ClientError> {
        let proxy = connect_or_spawn(&self.descriptor).await?;
        let result = proxy.ping_daemon().await;
        proxy.close().await;
        result
    }

    /// Invoke a remote method on the singleton object.
    pub async fn call(
        &self,
        method: &str,
        args: Vec<Value>,
        kwargs: Map<String, Value>,
    ) -> Result<Value, ClientError> {
        self.proxy().await?.call(method, args, kwargs).await
    }

    /// Ask the daemon to shut down, then wait for `runtime.bin` to
    /// disappear (bounded by `start_timeout`), removing it forcibly if the
    /// daemon failed to clean up after itself. If no daemon is currently
    /// reachable, this is a no-op beyond clearing any stale runtime file.
    /// Never spawns a daemon just to shut it down.
    pub async fn shutdown(&self, force: bool) -> Result<(), ClientError> {
        let paths = RuntimePaths::for_name(&self.descriptor.name, &self.descriptor.scope)?;

        let mut guard = self.session.lock().await;
        if let Some(proxy) = guard.take() {
            proxy.close().await;
        }
        drop(guard);

        if let Ok(auth_token) = std::fs::read_to_string(&paths.auth_file) {
            let expected_factory_id = self.descriptor.factory.factory_id();
            if let Ok(proxy) = connect_once(
                &paths,
                &auth_token,
                &expected_factory_id,
                self.descriptor.connect_timeout,
            )
            .await
            {
                let _ = proxy.shutdown_daemon(force).await;
                proxy.close().await;
            }
        }

        let deadline = Instant::now() + self.descriptor.start_timeout;
        while read_runtime(&paths).is_some() {
            if Instant::now() >= deadline {
                remove_runtime(&paths);
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
