//! Factory registry: the pluggable "import string → constructor" collaborator
//! that §9 calls out as external to the core ("a pluggable registry or
//! callback keyed by the `factory_import` string, supplied by embedding
//! code"). This crate has no reflection of its own; embedding crates (e.g. a
//! demo daemon binary) register concrete object types at compile time with
//! [`inventory::submit!`], the same mechanism the broader example pack uses
//! for plugin-style static registration.

use serde_json::{Map, Value};

use crate::factory::FactoryDescriptor;

/// A singleton object reachable via the daemon's `CALL` dispatch.
///
/// Method execution always happens on the daemon's single executor task
/// (§4.4), so implementations do not need their own internal locking for
/// state shared only across calls, just ordinary `&mut self` mutation.
pub trait RemoteObject: Send + 'static {
    /// Invoke `method` with positional `args` and keyword `kwargs`, returning
    /// the JSON-encodable result or a diagnostic string for `RemoteError`.
    /// The `_`-prefixed private-method rule is enforced by the daemon before
    /// this is ever called, not by implementors.
    fn call(&mut self, method: &str, args: Vec<Value>, kwargs: Map<String, Value>) -> Result<Value, String>;
}

/// Constructs a boxed [`RemoteObject`] from a validated factory descriptor.
pub type FactoryFn = fn(&FactoryDescriptor) -> Result<Box<dyn RemoteObject>, String>;

/// One `factory_import` string mapped to its constructor, collected at
/// link time via `inventory`.
pub struct FactoryRegistration {
    pub import: &'static str,
    pub factory: FactoryFn,
}

inventory::collect!(FactoryRegistration);

/// Register a concrete factory under an import string. Call this at crate
/// scope in an embedding binary:
///
/// ```ignore
/// register_factory!("demo:Counter", |descriptor| { /* ... */ });
/// ```
#[macro_export]
macro_rules! register_factory {
    ($import:expr, $factory:expr) => {
        $crate::inventory::submit! {
            $crate::registry::FactoryRegistration {
                import: $import,
                factory: $factory,
            }
        }
    };
}

/// Re-export so `register_factory!` can expand `$crate::inventory::submit!`
/// without requiring embedding crates to depend on `inventory` directly.
pub use inventory;

/// Look up the registered constructor for a factory import string.
pub fn lookup_factory(import: &str) -> Option<FactoryFn> {
    inventory::iter::<FactoryRegistration>()
        .find(|registration| registration.import == import)
        .map(|registration| registration.factory)
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
