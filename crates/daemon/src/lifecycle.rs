//! Daemon startup (§4.4 steps 1-5): load the auth token, load and validate
//! the factory payload, construct the singleton via the registry, bind the
//! loopback socket, and atomically publish `runtime.bin`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::mpsc;

use loopback_core::{
    ensure_auth_token, get_codec, lookup_factory, read_factory_payload,
    read_runtime as core_read_runtime, write_runtime, RemoteObject, RuntimeMetadata, RuntimePaths,
    PROTOCOL_VERSION,
};

use crate::error::LifecycleError;
use crate::executor::ExecItem;
use crate::state::DaemonShared;

/// The five-flag process contract from §6: `--name`, `--factory-file`,
/// `--idle-ttl`, `--serializer`, `--scope`.
#[derive(Debug, Clone)]
pub struct DaemonArgs {
    pub name: String,
    pub factory_file: PathBuf,
    pub idle_ttl: Duration,
    pub codec_name: String,
    pub scope: String,
}

/// Resolved configuration: every path the daemon touches, plus timing
/// knobs, computed once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub name: String,
    pub scope: String,
    pub codec_name: String,
    pub idle_ttl: Duration,
    pub paths: RuntimePaths,
    pub log_path: PathBuf,
    pub factory_file: PathBuf,
}

impl Config {
    pub fn load(args: &DaemonArgs) -> Result<Config, LifecycleError> {
        // §3/SPEC_FULL §3: an unsupported codec name is a configuration
        // error surfaced before a connection is ever attempted, not
        // something the wire layer discovers later.
        get_codec(&args.codec_name)?;
        let paths = RuntimePaths::for_name(&args.name, &args.scope)
            .map_err(|_| LifecycleError::NoStateDir)?;
        let log_path = paths.base_dir.join("daemon.log");
        let idle_ttl = crate::env::idle_ttl_override().unwrap_or(args.idle_ttl);
        Ok(Config {
            name: args.name.clone(),
            scope: args.scope.clone(),
            codec_name: args.codec_name.clone(),
            idle_ttl,
            paths,
            log_path,
            factory_file: args.factory_file.clone(),
        })
    }
}

/// Everything the process entrypoint needs once startup succeeds.
pub struct StartupResult {
    pub listener: TcpListener,
    pub shared: Arc<DaemonShared>,
    pub exec_tx: mpsc::UnboundedSender<ExecItem>,
    pub exec_handle: tokio::task::JoinHandle<()>,
    pub config: Config,
}

pub async fn startup(config: Config) -> Result<StartupResult, LifecycleError> {
    let auth_token = load_auth_token(&config.paths)?;
    let object = construct_object(&config.factory_file)?;
    let factory_id = read_factory_payload(&config.factory_file)
        .map(|payload| payload.descriptor.factory_id())
        .ok();

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let local_addr = listener.local_addr()?;

    let shared = Arc::new(DaemonShared::new(
        std::process::id(),
        auth_token,
        config.codec_name.clone(),
    ));

    let (exec_tx, exec_rx) = mpsc::unbounded_channel();
    let exec_handle = tokio::spawn(crate::executor::run(object, exec_rx));

    let record = RuntimeMetadata {
        protocol_version: PROTOCOL_VERSION,
        host: local_addr.ip().to_string(),
        port: local_addr.port(),
        pid: std::process::id(),
        codec_name: config.codec_name.clone(),
        started_at: now_as_unix_seconds(),
        factory_id,
    };
    write_runtime(&config.paths, &record)?;

    Ok(StartupResult {
        listener,
        shared,
        exec_tx,
        exec_handle,
        config,
    })
}

fn load_auth_token(paths: &RuntimePaths) -> Result<String, LifecycleError> {
    // The daemon never creates the token itself. A client must have
    // initialized it before spawning, per §4.4 step 1 ("fail fast if
    // absent"). `ensure_auth_token` is reused here only because it already
    // knows how to read an existing token; an absent directory/file still
    // surfaces as a missing token rather than silently creating one in the
    // daemon's own process, since `ensure_auth_token` only *creates* when no
    // token is found, which in the daemon's case would mean a client never
    // ran `ensure_auth_token` at all, a caller error either way.
    if !paths.auth_file.exists() {
        return Err(LifecycleError::AuthTokenMissing);
    }
    Ok(ensure_auth_token(paths)?)
}

fn construct_object(factory_file: &Path) -> Result<Box<dyn RemoteObject>, LifecycleError> {
    let payload = read_factory_payload(factory_file)
        .map_err(|e| LifecycleError::FactoryPayloadInvalid(e.to_string()))?;
    let factory = lookup_factory(&payload.descriptor.factory_import)
        .ok_or_else(|| LifecycleError::FactoryNotRegistered(payload.descriptor.factory_import.clone()))?;
    factory(&payload.descriptor).map_err(LifecycleError::FactoryConstruction)
}

fn now_as_unix_seconds() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Best-effort cleanup on exit (§4.4 `SHUTTING_DOWN → EXITED`): remove the
/// runtime metadata so the next client sees no daemon.
pub fn on_exit(paths: &RuntimePaths) {
    loopback_core::remove_runtime(paths);
}

/// Re-exported for callers that only need a liveness probe of an existing
/// runtime file without going through the full client coordinator.
pub fn read_runtime(paths: &RuntimePaths) -> Option<RuntimeMetadata> {
    core_read_runtime(paths)
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
