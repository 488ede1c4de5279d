//! The generic daemon engine (§4.4). This crate knows nothing about any
//! concrete singleton type. It accepts a factory import string, resolves it
//! against whatever [`loopback_core::registry`] an embedding binary linked
//! in, and runs the accept/executor/watchdog tasks. A runnable binary (e.g.
//! `demos/counter`) links this crate plus its own `RemoteObject`
//! registrations and a thin `main()`.
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

mod args;
mod env;
pub mod error;
mod executor;
pub mod lifecycle;
pub mod logging;
mod listener;
mod state;
mod watchdog;

pub use args::{parse as args_parse, ArgsOutcome, VERSION_STRING};
pub use error::LifecycleError;
pub use lifecycle::{startup, Config, DaemonArgs, StartupResult};
pub use state::DaemonShared;

use std::sync::Arc;

use tracing::{error, info};

/// Run one daemon end to end: startup, then the accept loop concurrently
/// with the watchdog, until a shutdown is requested; then drain the
/// in-flight executor queue, close the listener, and remove `runtime.bin`.
pub async fn run(args: DaemonArgs) -> Result<(), LifecycleError> {
    let config = Config::load(&args)?;

    logging::rotate_log_if_needed(&config.log_path);
    if let Err(e) = logging::write_startup_marker(&config.log_path, std::process::id()) {
        // Non-fatal: the marker is a diagnostics convenience, not a
        // correctness requirement.
        eprintln!("warning: could not write startup marker: {e}");
    }
    let _log_guard = logging::setup_logging(&config.log_path).map_err(LifecycleError::Io)?;

    info!(name = %config.name, "starting loopback singleton daemon");

    let startup_result = match startup(config.clone()).await {
        Ok(result) => result,
        Err(e) => {
            logging::write_startup_error(&config.log_path, &e);
            error!(error = %e, "daemon startup failed");
            return Err(e);
        }
    };

    let StartupResult {
        listener,
        shared,
        exec_tx,
        exec_handle,
        config,
    } = startup_result;

    let watchdog_handle = tokio::spawn(watchdog::run(
        Arc::clone(&shared),
        config.idle_ttl,
        env::watchdog_interval(),
    ));

    info!(port = %listener.local_addr().map(|a| a.port()).unwrap_or(0), "daemon ready");

    // `listener::run` only returns once every handler task it spawned has
    // finished, so `exec_tx` (and every handler's own clone of it) is fully
    // dropped by the time we get here: the executor's channel closes and
    // `exec_handle` resolves only after it has drained whatever item it was
    // running, never cancelling it mid-call (§4.4).
    listener::run(listener, Arc::clone(&shared), exec_tx).await;
    let _ = exec_handle.await;

    watchdog_handle.abort();
    lifecycle::on_exit(&config.paths);
    info!("daemon stopped");
    Ok(())
}
