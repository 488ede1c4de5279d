//! Daemon process discovery and detached spawn (§4.5 step 3d, §6 "Daemon
//! process invocation").

use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::descriptor::ServiceDescriptor;
use crate::error::ClientError;

const DAEMON_BINARY_NAME: &str = "loopbackd";

/// Resolve the `loopbackd` binary: an explicit env override first, then a
/// `target/debug` sibling next to the current debug-build executable (so
/// integration tests can find a binary built in the same workspace without
/// installing anything), then a binary alongside the current executable,
/// then a bare `PATH` lookup by name.
pub fn find_daemon_binary() -> PathBuf {
    if let Some(path) = crate::env::daemon_binary_override() {
        return PathBuf::from(path);
    }

    let current_exe = std::env::current_exe().ok();
    let is_debug_build = current_exe
        .as_ref()
        .and_then(|p| p.to_str())
        .map(|s| s.contains("target/debug") || s.contains("target\\debug"))
        .unwrap_or(false);

    if is_debug_build {
        if let Some(manifest_dir) = std::env::var_os("CARGO_MANIFEST_DIR") {
            let dev_path = PathBuf::from(manifest_dir)
                .parent()
                .and_then(|p| p.parent())
                .map(|p| p.join("target").join("debug").join(DAEMON_BINARY_NAME));
            if let Some(path) = dev_path {
                if path.exists() {
                    return path;
                }
            }
        }
    }

    if let Some(exe) = current_exe {
        if let Some(dir) = exe.parent() {
            let sibling = dir.join(DAEMON_BINARY_NAME);
            if sibling.exists() {
                return sibling;
            }
        }
    }

    PathBuf::from(DAEMON_BINARY_NAME)
}

/// Build the five-flag argument vector the daemon process contract expects
/// (§6).
pub fn daemon_args(descriptor: &ServiceDescriptor, factory_file: &std::path::Path) -> Vec<String> {
    vec![
        "--name".to_string(),
        descriptor.name.clone(),
        "--factory-file".to_string(),
        factory_file.display().to_string(),
        "--idle-ttl".to_string(),
        descriptor.idle_ttl.as_secs_f64().to_string(),
        "--serializer".to_string(),
        descriptor.codec_name.clone(),
        "--scope".to_string(),
        descriptor.scope.clone(),
    ]
}

/// Spawn the daemon in the background: stdio redirected to the null device
/// so the parent's terminal is never inherited, `DETACHED_PROCESS` +
/// `CREATE_NEW_PROCESS_GROUP` on Windows so it survives the spawning client
/// exiting. The parent never waits on the child (§4.5 step 3d).
pub fn spawn_detached(
    descriptor: &ServiceDescriptor,
    factory_file: &std::path::Path,
) -> Result<std::process::Child, ClientError> {
    let binary = find_daemon_binary();
    let mut command = Command::new(binary);
    command
        .args(daemon_args(descriptor, factory_file))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    apply_detach_flags(&mut command);

    command
        .spawn()
        .map_err(|e| ClientError::DaemonStartFailed(e.to_string()))
}

#[cfg(windows)]
fn apply_detach_flags(command: &mut Command) {
    use std::os::windows::process::CommandExt;
    const DETACHED_PROCESS: u32 = 0x0000_0008;
    const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
    command.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);
}

/// The POSIX equivalent of the Windows branch above: put the child in its
/// own new session (`setsid`-equivalent) so it survives the spawning
/// client's session ending, via the safe, stable
/// `CommandExt::process_group` API (a `pgid` of `0` asks the OS to make the
/// child both session leader and process group leader of a new group).
#[cfg(unix)]
fn apply_detach_flags(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(test)]
#[path = "daemon_process_tests.rs"]
mod tests;
