//! Invocation manifests consumed by the host CLI.
//!
//! A manifest names a function and binds each of its parameters to a generic
//! provider. Parameters keep authoring order (via `IndexMap`) so the host can
//! build requests in the same order the author wrote them.

use std::{fmt, path::PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::StepOrder;

const DEFAULT_QUEUE_BATCH_SIZE: usize = 32;

/// Authored description of a single invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationManifest {
    /// Name of the function to invoke.
    pub function: String,
    /// Bindings keyed by parameter name.
    #[serde(default)]
    pub parameters: IndexMap<String, ParameterBinding>,
}

/// Declarative binding for one parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParameterBinding {
    /// Read-only literal value.
    Constant { value: Value },
    /// UTF-8 file read before invocation and written back afterwards.
    File {
        path: PathBuf,
        #[serde(default)]
        step_order: Option<StepOrder>,
    },
    /// JSON-lines queue file receiving every item the function emits.
    Queue {
        path: PathBuf,
        #[serde(default = "default_queue_batch_size")]
        batch_size: usize,
    },
}

/// Discriminant of a [`ParameterBinding`], used for display and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Constant,
    File,
    Queue,
}

impl fmt::Display for BindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BindingKind::Constant => "constant",
            BindingKind::File => "file",
            BindingKind::Queue => "queue",
        };
        f.write_str(label)
    }
}

impl ParameterBinding {
    pub fn kind(&self) -> BindingKind {
        match self {
            ParameterBinding::Constant { .. } => BindingKind::Constant,
            ParameterBinding::File { .. } => BindingKind::File,
            ParameterBinding::Queue { .. } => BindingKind::Queue,
        }
    }
}

impl InvocationManifest {
    /// Checks authoring constraints that serde cannot express.
    ///
    /// Returns every violation found rather than stopping at the first one.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut violations = Vec::new();
        if self.function.trim().is_empty() {
            violations.push("function name must not be empty".to_string());
        }
        for (name, binding) in &self.parameters {
            if name.trim().is_empty() {
                violations.push("parameter names must not be empty".to_string());
            }
            if let ParameterBinding::Queue { batch_size: 0, .. } = binding {
                violations.push(format!("parameter '{}': batch_size must be greater than zero", name));
            }
            if let ParameterBinding::File { path, .. } | ParameterBinding::Queue { path, .. } = binding
                && path.as_os_str().is_empty()
            {
                violations.push(format!("parameter '{}': path must not be empty", name));
            }
        }
        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }
}

fn default_queue_batch_size() -> usize {
    DEFAULT_QUEUE_BATCH_SIZE
}
