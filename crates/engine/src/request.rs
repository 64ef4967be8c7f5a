//! Invocation requests: the function plus one provider per parameter.

use std::{fmt, sync::Arc};

use indexmap::IndexMap;

use crate::{function::TargetFunction, provider::ValueProvider};

/// A single invocation: the target function and the providers bound to its parameters.
///
/// Providers keep insertion order; that order breaks ties between providers
/// sharing a step order. Consumed by [`FunctionExecutor::execute`](crate::FunctionExecutor::execute).
pub struct InvocationRequest {
    function: Arc<dyn TargetFunction>,
    providers: IndexMap<String, Box<dyn ValueProvider>>,
}

impl InvocationRequest {
    pub fn new(function: Arc<dyn TargetFunction>) -> Self {
        Self {
            function,
            providers: IndexMap::new(),
        }
    }

    /// Binds `provider` to `parameter`, replacing any earlier binding with the same name.
    pub fn with_provider(mut self, parameter: impl Into<String>, provider: impl ValueProvider + 'static) -> Self {
        self.bind(parameter, Box::new(provider));
        self
    }

    pub fn bind(&mut self, parameter: impl Into<String>, provider: Box<dyn ValueProvider>) {
        self.providers.insert(parameter.into(), provider);
    }

    pub fn function(&self) -> &Arc<dyn TargetFunction> {
        &self.function
    }

    pub fn function_name(&self) -> &str {
        &self.function.descriptor().name
    }

    pub fn provider_names(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    pub(crate) fn into_parts(self) -> (Arc<dyn TargetFunction>, IndexMap<String, Box<dyn ValueProvider>>) {
        (self.function, self.providers)
    }
}

impl fmt::Debug for InvocationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationRequest")
            .field("function", &self.function_name())
            .field("providers", &self.providers)
            .finish()
    }
}
