//! Execution result reporting.
//!
//! Turns the outcome of one invocation into an [`ExecutionResult`] and writes
//! the matching transcript block: the full cause chain (outermost first),
//! extended transport details, traces, and the final `Success`/`FAIL` marker.

use chrono::{DateTime, Utc};
use serde_json::Value;
use spindle_types::{ExecutionResult, TransportDetails};
use spindle_util::redact_sensitive;
use tracing::{info, warn};

use crate::{DiagnosticLog, Fault, executor::InvocationError};

pub const SUCCESS_MARKER: &str = "Success";
pub const FAILURE_MARKER: &str = "FAIL";

/// One link of the reported chain.
struct ReportLink<'a> {
    type_name: &'a str,
    message: String,
    trace: Option<&'a str>,
    transport: Option<&'a TransportDetails>,
}

impl<'a> From<&'a Fault> for ReportLink<'a> {
    fn from(fault: &'a Fault) -> Self {
        Self {
            type_name: fault.type_name(),
            message: fault.message().to_string(),
            trace: fault.trace(),
            transport: fault.transport_details(),
        }
    }
}

/// Flattens an invocation error into report links, outermost first.
fn report_links(error: &InvocationError) -> Vec<ReportLink<'_>> {
    match error {
        InvocationError::UserFunction(fault) => fault.chain().map(ReportLink::from).collect(),
        other => {
            let outer = ReportLink {
                type_name: other.type_name(),
                message: other.to_string(),
                trace: None,
                transport: None,
            };
            std::iter::once(outer)
                .chain(other.fault().into_iter().flat_map(Fault::chain).map(ReportLink::from))
                .collect()
        }
    }
}

fn transport_lines(details: &TransportDetails) -> Vec<String> {
    let mut lines = vec!["  Extended error information:".to_string()];
    if let Some(code) = &details.error_code {
        lines.push(format!("    Code: {}", code));
    }
    if let Some(message) = &details.error_message {
        lines.push(format!("    Message: {}", redact_sensitive(message)));
    }
    for (key, value) in &details.additional_details {
        lines.push(format!("    {}: {}", key, redact_sensitive(value)));
    }
    lines
}

/// Renders the transcript block for a failed invocation, without the marker.
pub fn render_failure(error: &InvocationError) -> Vec<String> {
    let mut lines = vec!["Exception while executing:".to_string()];
    for (index, link) in report_links(error).into_iter().enumerate() {
        if index > 0 {
            lines.push("Caused by:".to_string());
        }
        lines.push(format!("{}: {}", link.type_name, redact_sensitive(&link.message)));
        if let Some(details) = link.transport {
            lines.extend(transport_lines(details));
        }
        if let Some(trace) = link.trace {
            lines.extend(trace.lines().map(|line| format!("   {}", line)));
        }
    }
    lines
}

/// Packages an invocation outcome and writes it to the transcript.
pub fn report_outcome(
    log: &DiagnosticLog,
    function: &str,
    started_at: DateTime<Utc>,
    outcome: Result<Option<Value>, InvocationError>,
) -> ExecutionResult {
    let completed_at = Utc::now();
    match outcome {
        Ok(return_value) => {
            log.line(SUCCESS_MARKER);
            info!(function = %function, elapsed_ms = (completed_at - started_at).num_milliseconds(), "function invocation succeeded");
            ExecutionResult::succeeded(function, started_at, completed_at).with_return_value(return_value)
        }
        Err(error) => {
            let mut lines = render_failure(&error);
            lines.push(FAILURE_MARKER.to_string());
            log.lines(lines);
            warn!(function = %function, error_type = %error.type_name(), error = %error, "function invocation failed");
            ExecutionResult::failed(function, error.type_name(), error.to_string(), started_at, completed_at)
        }
    }
}
