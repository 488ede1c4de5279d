//! Factory description and factory identity (§3, §9).
//!
//! The object-construction mechanism itself is an external collaborator (a
//! registry supplied by embedding code, see [`crate::registry`]); this
//! module only carries the *description* of a factory call across the wire
//! and derives a content hash from it, matching the daemon's own
//! `hash_runbook` pattern of hashing a canonicalized `serde_json::Value`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::version::PROTOCOL_VERSION;

/// An opaque "how to construct the singleton" description: an import string
/// plus positional and keyword arguments. The core never interprets
/// `import`; it is handed intact to the registry collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactoryDescriptor {
    pub factory_import: String,
    #[serde(default)]
    pub factory_args: Vec<Value>,
    #[serde(default)]
    pub factory_kwargs: Map<String, Value>,
}

impl FactoryDescriptor {
    /// Validate the shape required by §4.4 step 2: a non-empty import
    /// string, a sequence of args, a mapping of kwargs. `serde`'s types
    /// already guarantee args/kwargs shape; only emptiness needs checking.
    pub fn validate(&self) -> Result<(), String> {
        if self.factory_import.trim().is_empty() {
            return Err("factory_import must be a non-empty string".to_string());
        }
        Ok(())
    }

    /// Eight-byte content hash over `(factory_import, args, canonicalized
    /// kwargs)`, rendered as 16 hex characters. `serde_json::Map`'s default
    /// backing store is a `BTreeMap` (the workspace never enables the
    /// `preserve_order` feature), so `serde_json::to_string` already sorts
    /// every nested mapping's keys recursively, exactly the canonicalization
    /// §3 asks for, with no extra code.
    pub fn factory_id(&self) -> String {
        let canonical = Value::Array(vec![
            Value::String(self.factory_import.clone()),
            Value::Array(self.factory_args.clone()),
            Value::Object(self.factory_kwargs.clone()),
        ]);
        // `Value`'s `Display` impl serializes infallibly (no writer I/O, no
        // non-finite floats reachable from wire-decoded JSON), so this never
        // needs a `Result`.
        let encoded = canonical.to_string();
        let digest = Sha256::digest(encoded.as_bytes());
        hex::encode(&digest[..8])
    }
}

/// On-disk payload written to `factory.bin` (§6), handed to the daemon
/// instead of argv so constructor data never shows up in `ps`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactoryPayload {
    pub protocol_version: u32,
    #[serde(flatten)]
    pub descriptor: FactoryDescriptor,
}

impl FactoryPayload {
    pub fn new(descriptor: FactoryDescriptor) -> FactoryPayload {
        FactoryPayload {
            protocol_version: PROTOCOL_VERSION,
            descriptor,
        }
    }
}

#[cfg(test)]
#[path = "factory_tests.rs"]
mod tests;
