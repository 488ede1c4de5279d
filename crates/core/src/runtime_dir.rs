//! Runtime directory: per-name filesystem home for auth token, liveness
//! metadata, factory payload, and the startup lock (§4.2).

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::factory::FactoryPayload;

const RUNTIME_SUBDIR: &str = "loopback-singleton";

/// The files making up one name's runtime home.
#[derive(Debug, Clone)]
pub struct RuntimePaths {
    pub base_dir: PathBuf,
    pub runtime_file: PathBuf,
    pub auth_file: PathBuf,
    pub lock_file: PathBuf,
    pub factory_file: PathBuf,
}

impl RuntimePaths {
    pub fn for_name(name: &str, scope: &str) -> Result<RuntimePaths, ProtocolError> {
        let base = base_dir(scope)?.join(RUNTIME_SUBDIR).join(name);
        Ok(RuntimePaths {
            runtime_file: base.join("runtime.bin"),
            auth_file: base.join("auth.bin"),
            lock_file: base.join("lockfile.lock"),
            factory_file: base.join("factory.bin"),
            base_dir: base,
        })
    }
}

/// Resolve the platform base directory for `scope = "user"`, the only scope
/// currently implemented.
fn base_dir(scope: &str) -> Result<PathBuf, ProtocolError> {
    if scope != "user" {
        return Err(ProtocolError::Codec(format!(
            "unsupported scope: {scope} (only \"user\" is implemented)"
        )));
    }

    if cfg!(windows) {
        if let Ok(local_app_data) = std::env::var("LOCALAPPDATA") {
            if !local_app_data.is_empty() {
                return Ok(PathBuf::from(local_app_data));
            }
        }
        let home = dirs::home_dir()
            .ok_or_else(|| ProtocolError::Codec("could not resolve home directory".to_string()))?;
        return Ok(home.join("AppData").join("Local"));
    }

    if let Ok(xdg) = std::env::var("XDG_RUNTIME_DIR") {
        let path = PathBuf::from(&xdg);
        if is_usable_posix_runtime_dir(&path) {
            return Ok(path);
        }
    }
    let home = dirs::home_dir()
        .ok_or_else(|| ProtocolError::Codec("could not resolve home directory".to_string()))?;
    Ok(home.join(".cache"))
}

/// `$XDG_RUNTIME_DIR` is usable only if it exists, is a directory, and is
/// writable/traversable for the calling user, otherwise fall back to
/// `~/.cache` rather than risk a directory owned by someone else.
#[cfg(unix)]
fn is_usable_posix_runtime_dir(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    let metadata = match fs::metadata(path) {
        Ok(m) => m,
        Err(_) => return false,
    };
    if !metadata.is_dir() {
        return false;
    }
    let mode = metadata.permissions().mode();
    // Owner read+write+execute is the practical floor for "writable and
    // traversable"; a fuller check would compare uid, but this directory is
    // conventionally created mode 0700 by the OS for the session owner.
    mode & 0o700 == 0o700
}

#[cfg(not(unix))]
fn is_usable_posix_runtime_dir(_path: &Path) -> bool {
    false
}

fn ensure_dir_owner_only(path: &Path) -> Result<(), ProtocolError> {
    fs::create_dir_all(path)?;
    chmod_owner_only(path, 0o700);
    Ok(())
}

#[cfg(unix)]
fn chmod_owner_only(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    // Best-effort hardening; failures (e.g. a read-only filesystem, or a
    // directory owned by another process in a race) are tolerated per §4.2.
    let _ = fs::set_permissions(path, fs::Permissions::from_mode(mode));
}

#[cfg(not(unix))]
fn chmod_owner_only(_path: &Path, _mode: u32) {}

/// Create the directory (if needed) and return an existing or freshly
/// generated 64-char hex auth token, with exclusive-create semantics so two
/// racing first-clients cannot overwrite each other's token.
pub fn ensure_auth_token(paths: &RuntimePaths) -> Result<String, ProtocolError> {
    ensure_dir_owner_only(&paths.base_dir)?;

    if let Ok(mut existing) = File::open(&paths.auth_file) {
        chmod_owner_only(&paths.auth_file, 0o600);
        let mut contents = String::new();
        if existing.read_to_string(&mut contents).is_ok() {
            return Ok(contents);
        }
    }

    let mut token_bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut token_bytes);
    let token = hex::encode(token_bytes);

    match OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(&paths.auth_file)
    {
        Ok(mut file) => {
            file.write_all(token.as_bytes())?;
            chmod_owner_only(&paths.auth_file, 0o600);
            Ok(token)
        }
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            chmod_owner_only(&paths.auth_file, 0o600);
            let mut contents = String::new();
            File::open(&paths.auth_file)?.read_to_string(&mut contents)?;
            Ok(contents)
        }
        Err(e) => Err(ProtocolError::Io(e)),
    }
}

/// Liveness advertisement published by the daemon at bind time (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeMetadata {
    pub protocol_version: u32,
    pub host: String,
    pub port: u16,
    pub pid: u32,
    pub codec_name: String,
    pub started_at: f64,
    #[serde(default)]
    pub factory_id: Option<String>,
}

/// Decoded metadata, or `None` for any form of "not usable": missing file,
/// permission error, truncated read, or malformed contents. Corrupt state
/// self-heals by looking exactly like no daemon is running.
pub fn read_runtime(paths: &RuntimePaths) -> Option<RuntimeMetadata> {
    let bytes = fs::read(&paths.runtime_file).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Atomically publish (or replace) the runtime metadata file: write to a
/// sibling `.tmp`, harden permissions, rename over the target, re-harden.
pub fn write_runtime(paths: &RuntimePaths, record: &RuntimeMetadata) -> Result<(), ProtocolError> {
    ensure_dir_owner_only(&paths.base_dir)?;
    let tmp_path = tmp_sibling(&paths.runtime_file);
    let encoded = serde_json::to_vec(record).map_err(|e| ProtocolError::Codec(e.to_string()))?;
    {
        let mut tmp = File::create(&tmp_path)?;
        tmp.write_all(&encoded)?;
        tmp.sync_all()?;
    }
    chmod_owner_only(&tmp_path, 0o600);
    fs::rename(&tmp_path, &paths.runtime_file)?;
    chmod_owner_only(&paths.runtime_file, 0o600);
    Ok(())
}

/// Best-effort unlink of `runtime.bin`, its `.tmp`, `factory.bin`, and its
/// `.tmp`. Missing files are not an error.
pub fn remove_runtime(paths: &RuntimePaths) {
    for path in [
        &paths.runtime_file,
        &tmp_sibling(&paths.runtime_file),
        &paths.factory_file,
        &tmp_sibling(&paths.factory_file),
    ] {
        let _ = fs::remove_file(path);
    }
}

/// Write the factory payload file a client hands off to a spawning daemon.
pub fn write_factory_payload(
    paths: &RuntimePaths,
    payload: &FactoryPayload,
) -> Result<(), ProtocolError> {
    ensure_dir_owner_only(&paths.base_dir)?;
    let tmp_path = tmp_sibling(&paths.factory_file);
    let encoded = serde_json::to_vec(payload).map_err(|e| ProtocolError::Codec(e.to_string()))?;
    {
        let mut tmp = File::create(&tmp_path)?;
        tmp.write_all(&encoded)?;
        tmp.sync_all()?;
    }
    chmod_owner_only(&tmp_path, 0o600);
    fs::rename(&tmp_path, &paths.factory_file)?;
    chmod_owner_only(&paths.factory_file, 0o600);
    Ok(())
}

/// Read and validate the factory payload file (§4.4 step 2).
pub fn read_factory_payload(path: &Path) -> Result<FactoryPayload, ProtocolError> {
    let bytes = fs::read(path)?;
    let payload: FactoryPayload =
        serde_json::from_slice(&bytes).map_err(|e| ProtocolError::Codec(e.to_string()))?;
    payload
        .descriptor
        .validate()
        .map_err(ProtocolError::Codec)?;
    Ok(payload)
}

fn tmp_sibling(path: &Path) -> PathBuf {
    path.with_extension("tmp")
}

#[cfg(test)]
#[path = "runtime_dir_tests.rs"]
mod tests;
