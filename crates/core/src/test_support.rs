//! Test-only helpers shared across crates (feature = "test-support").
//!
//! Kept inside `loopback-core` rather than duplicated per-crate so the
//! daemon and client test suites exercise the exact same fixtures.

use serde_json::{Map, Value};

use crate::registry::RemoteObject;

/// A minimal in-memory counter, used by the daemon's and client's own unit
/// tests wherever a throwaway `RemoteObject` is needed without pulling in a
/// full demo binary. `CALL "inc"` increments and returns the new value;
/// `CALL "fail"` always errors, to exercise the `RemoteError` path.
pub struct CounterObject {
    pub value: i64,
    pub step: i64,
}

impl CounterObject {
    pub fn new(start: i64, step: i64) -> CounterObject {
        CounterObject { value: start, step }
    }
}

impl RemoteObject for CounterObject {
    fn call(
        &mut self,
        method: &str,
        _args: Vec<Value>,
        _kwargs: Map<String, Value>,
    ) -> Result<Value, String> {
        match method {
            "inc" => {
                self.value += self.step;
                Ok(Value::from(self.value))
            }
            "get" => Ok(Value::from(self.value)),
            "fail" => Err("RuntimeError: boom".to_string()),
            other => Err(format!("no such method: {other}")),
        }
    }
}
