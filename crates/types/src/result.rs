//! Outcome records produced once per invocation.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Uniform outcome of a single function invocation.
///
/// Success is implied by empty exception fields. Every failure class (missing
/// provider, bind failure, user function failure, commit failure) is folded
/// into this record instead of being returned as an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Name of the invoked function.
    pub function: String,
    /// Type name of the outermost reported failure, empty on success.
    #[serde(default)]
    pub exception_type: String,
    /// Message of the outermost reported failure, empty on success.
    #[serde(default)]
    pub exception_message: String,
    /// Value produced by an asynchronous function, when it returned one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_value: Option<Value>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl ExecutionResult {
    /// Creates a successful result.
    pub fn succeeded(function: impl Into<String>, started_at: DateTime<Utc>, completed_at: DateTime<Utc>) -> Self {
        Self {
            function: function.into(),
            exception_type: String::new(),
            exception_message: String::new(),
            return_value: None,
            started_at,
            completed_at,
        }
    }

    /// Creates a failed result from the outermost failure's type and message.
    pub fn failed(
        function: impl Into<String>,
        exception_type: impl Into<String>,
        exception_message: impl Into<String>,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            function: function.into(),
            exception_type: exception_type.into(),
            exception_message: exception_message.into(),
            return_value: None,
            started_at,
            completed_at,
        }
    }

    pub fn with_return_value(mut self, return_value: Option<Value>) -> Self {
        self.return_value = return_value;
        self
    }

    /// Returns true when no failure was recorded.
    pub fn is_success(&self) -> bool {
        self.exception_type.is_empty() && self.exception_message.is_empty()
    }

    /// Wall-clock duration between start and completion.
    pub fn duration(&self) -> chrono::Duration {
        self.completed_at - self.started_at
    }
}

/// Extended error information attached to storage or queue layer failures.
///
/// Transport clients report a service error code and message plus free-form
/// key/value details; the reporter appends these to the diagnostic transcript.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportDetails {
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    /// Additional details in the order the service reported them.
    #[serde(default)]
    pub additional_details: IndexMap<String, String>,
}

impl TransportDetails {
    pub fn new(error_code: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            error_code: Some(error_code.into()),
            error_message: Some(error_message.into()),
            additional_details: IndexMap::new(),
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.additional_details.insert(key.into(), value.into());
        self
    }

    /// Returns true when the transport reported nothing beyond the base failure.
    pub fn is_empty(&self) -> bool {
        self.error_code.is_none() && self.error_message.is_none() && self.additional_details.is_empty()
    }
}
