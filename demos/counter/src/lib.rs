//! A concrete demo singleton: a counter with a configurable step, reachable
//! over the loopback protocol. Exists to give the workspace's integration
//! tests and `loopback-demo-daemon` binary a real, runnable `RemoteObject`
//! instead of the bare test fixture in `loopback-core::test_support`.
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

use serde_json::{Map, Value};

use loopback_core::{register_factory, FactoryDescriptor, RemoteObject};

/// `factory_import` string this demo registers under.
pub const FACTORY_IMPORT: &str = "demo:Counter";

/// A mutable counter. `CALL "inc"` advances by `step` and returns the new
/// value; `CALL "get"` returns the current value without mutating it;
/// `CALL "fail"` always errors, exercising the `RemoteError` path end to
/// end in the workspace's black-box specs.
pub struct Counter {
    value: i64,
    step: i64,
}

impl Counter {
    pub fn new(start: i64, step: i64) -> Counter {
        Counter { value: start, step }
    }
}

impl RemoteObject for Counter {
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

/// `factory_args`/`factory_kwargs` shape: `args = [start, step]`, both
/// optional, defaulting to `0` and `1` respectively. Kwargs are accepted
/// but ignored. This demo has no named parameters.
fn construct(descriptor: &FactoryDescriptor) -> Result<Box<dyn RemoteObject>, String> {
    let start = descriptor
        .factory_args
        .first()
        .and_then(Value::as_i64)
        .unwrap_or(0);
    let step = descriptor
        .factory_args
        .get(1)
        .and_then(Value::as_i64)
        .unwrap_or(1);
    Ok(Box::new(Counter::new(start, step)))
}

register_factory!(FACTORY_IMPORT, construct);

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
