use thiserror::Error;

use crate::Fault;

/// Why an invocation failed. Every variant ends up in the execution result.
#[derive(Debug, Error)]
pub enum InvocationError {
    /// A declared parameter has no provider in the request.
    #[error("no value provider is bound to parameter '{parameter}' of function '{function}'")]
    Resolution { function: String, parameter: String },

    /// A provider failed to produce its argument; nothing was invoked or committed.
    #[error("error while binding parameter '{parameter}'")]
    Bind {
        parameter: String,
        #[source]
        source: Fault,
    },

    /// The function body returned a fault or panicked.
    #[error(transparent)]
    UserFunction(Fault),

    /// A provider failed to commit or release after the function returned.
    #[error("error while handling parameter {parameter} '{value}' after function returned")]
    Commit {
        parameter: String,
        value: String,
        #[source]
        source: Fault,
    },
}

impl InvocationError {
    /// Type name reported in the execution result.
    pub fn type_name(&self) -> &str {
        match self {
            InvocationError::Resolution { .. } => "ResolutionError",
            InvocationError::Bind { .. } => "BindError",
            InvocationError::UserFunction(fault) => fault.type_name(),
            InvocationError::Commit { .. } => "CommitError",
        }
    }

    /// The fault carried beneath the top-level message, if any.
    ///
    /// For a user-function failure this is the top-level fault itself.
    pub fn fault(&self) -> Option<&Fault> {
        match self {
            InvocationError::Resolution { .. } => None,
            InvocationError::Bind { source, .. } | InvocationError::Commit { source, .. } => Some(source),
            InvocationError::UserFunction(fault) => Some(fault),
        }
    }

    pub fn is_user_function(&self) -> bool {
        matches!(self, InvocationError::UserFunction(_))
    }
}
