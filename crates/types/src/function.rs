//! Function signature metadata and commit priorities.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Commit priority of a bound parameter.
///
/// Parameters commit in ascending order once the function returns. Providers
/// that do not declare an order use [`StepOrder::DEFAULT`]; bindings whose
/// commit has externally visible side effects (for example enqueuing a
/// message) use [`StepOrder::ENQUEUE`] so they run after everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepOrder(pub i32);

impl StepOrder {
    /// Order used by providers that do not declare one.
    pub const DEFAULT: StepOrder = StepOrder(0);
    /// Order used by enqueue-style output bindings.
    pub const ENQUEUE: StepOrder = StepOrder(1);

    /// Returns true when this order is elevated above the default.
    pub fn is_elevated(self) -> bool {
        self > Self::DEFAULT
    }
}

impl Default for StepOrder {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for StepOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Declared parameter of a target function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    /// Parameter name used to look up its provider.
    pub name: String,
    /// Optional declared type, informational only.
    #[serde(default)]
    pub r#type: Option<String>,
}

impl ParameterDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            r#type: None,
        }
    }

    pub fn typed(name: impl Into<String>, r#type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            r#type: Some(r#type.into()),
        }
    }
}

/// Signature metadata for a target function: its name and ordered parameters.
///
/// The descriptor is supplied by whatever discovers functions; the executor
/// treats the parameter order as the argument order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDescriptor {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<ParameterDescriptor>,
}

impl FunctionDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
        }
    }

    /// Appends an untyped parameter.
    pub fn with_parameter(mut self, name: impl Into<String>) -> Self {
        self.parameters.push(ParameterDescriptor::new(name));
        self
    }

    /// Appends a parameter with a declared type name.
    pub fn with_typed_parameter(mut self, name: impl Into<String>, r#type: impl Into<String>) -> Self {
        self.parameters.push(ParameterDescriptor::typed(name, r#type));
        self
    }

    /// Iterates parameter names in declaration order.
    pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
        self.parameters.iter().map(|parameter| parameter.name.as_str())
    }
}
