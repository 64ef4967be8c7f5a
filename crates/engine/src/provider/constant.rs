use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::ValueProvider;
use crate::Fault;

/// Read-only provider handing the same literal to every invocation.
#[derive(Debug, Clone)]
pub struct ConstantProvider {
    value: Value,
}

impl ConstantProvider {
    pub fn new(value: impl Into<Value>) -> Self {
        Self { value: value.into() }
    }
}

impl ValueProvider for ConstantProvider {
    fn get_value(&mut self, _cancellation: &CancellationToken) -> Result<Value, Fault> {
        Ok(self.value.clone())
    }
}
