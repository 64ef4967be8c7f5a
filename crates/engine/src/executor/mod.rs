//! Invocation executor: resolve, bind, invoke, commit, stop the watch, report.
//!
//! - `resolve_parameters` pairs every declared parameter with its provider
//! - `bind_parameters` produces the arguments and the per-parameter watches
//! - `FunctionExecutor::execute` runs the whole pipeline and never fails: every
//!   outcome becomes an [`ExecutionResult`]
//!
//! Once the function has been invoked the commit phase always runs, and the
//! self-watch is stopped only after it, so snapshots include commit-time effects.

mod error;

use chrono::{SecondsFormat, Utc};
use indexmap::IndexMap;
use serde_json::Value;
use spindle_types::{ExecutionResult, FunctionDescriptor, StepOrder};
use spindle_util::{block_on_future, redact_sensitive, truncate_for_display};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub use error::InvocationError;

use crate::{
    Arguments, DiagnosticLog, ExecutorConfig, Fault, FunctionReturn, InvocationRequest, TargetFunction,
    fault::catch_panic,
    provider::{ProviderCapabilities, ValueProvider, value_for_display},
    report::report_outcome,
    step_order::commit_sequence,
    watch::{SelfWatch, Watch},
};

pub const PARAMETERS_BOUND_MESSAGE: &str = "Parameters bound. Invoking user function.";
pub const SEPARATOR: &str = "--------";
/// Fault type reported when a returned task cannot be driven to completion.
pub const RUNTIME_ERROR: &str = "RuntimeError";

/// A declared parameter paired with the provider bound to it.
///
/// The provider's step order and capabilities are read once while binding
/// and reused by the commit phase.
#[derive(Debug)]
pub struct BoundParameter {
    name: String,
    /// Position of the provider in the request mapping.
    position: usize,
    provider: Box<dyn ValueProvider>,
    step_order: StepOrder,
    capabilities: ProviderCapabilities,
}

impl BoundParameter {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn step_order(&self) -> StepOrder {
        self.step_order
    }

    pub fn capabilities(&self) -> ProviderCapabilities {
        self.capabilities
    }
}

/// Arguments for the function and the watches aligned with them.
#[derive(Debug)]
pub struct BoundArguments {
    pub arguments: Arguments,
    /// One entry per declared parameter; `None` where the provider has no watcher.
    pub watches: Vec<Option<Watch>>,
}

/// Pairs each declared parameter with its provider, in declaration order.
///
/// Providers naming no declared parameter are dropped with a warning.
pub fn resolve_parameters(
    descriptor: &FunctionDescriptor,
    providers: IndexMap<String, Box<dyn ValueProvider>>,
) -> Result<Vec<BoundParameter>, InvocationError> {
    let mut providers: IndexMap<String, (usize, Box<dyn ValueProvider>)> = providers
        .into_iter()
        .enumerate()
        .map(|(position, (name, provider))| (name, (position, provider)))
        .collect();
    let mut resolved = Vec::with_capacity(descriptor.parameters.len());
    for parameter in &descriptor.parameters {
        let Some((position, provider)) = providers.swap_remove(&parameter.name) else {
            return Err(InvocationError::Resolution {
                function: descriptor.name.clone(),
                parameter: parameter.name.clone(),
            });
        };
        resolved.push(BoundParameter {
            name: parameter.name.clone(),
            position,
            provider,
            step_order: StepOrder::DEFAULT,
            capabilities: ProviderCapabilities::READ_ONLY,
        });
    }
    for unused in providers.keys() {
        warn!(function = %descriptor.name, parameter = %unused, "provider bound to an undeclared parameter; ignoring");
    }
    Ok(resolved)
}

/// Asks every provider for its argument. The first failure aborts binding.
///
/// Everything the later phases need from a provider (watcher, step order,
/// capabilities) is read here, so a panicking provider fails the bind.
pub fn bind_parameters(parameters: &mut [BoundParameter], cancellation: &CancellationToken) -> Result<BoundArguments, InvocationError> {
    let mut arguments = Arguments::with_capacity(parameters.len());
    let mut watches = Vec::with_capacity(parameters.len());
    for parameter in parameters.iter_mut() {
        let provider = &mut parameter.provider;
        let (value, watcher, step_order, capabilities) = catch_panic(|| {
            let value = provider.get_value(cancellation)?;
            Ok((value, provider.watcher(), provider.step_order(), provider.capabilities()))
        })
        .map_err(|source| InvocationError::Bind {
            parameter: parameter.name.clone(),
            source,
        })?;
        parameter.step_order = step_order;
        parameter.capabilities = capabilities;
        arguments.push(parameter.name.clone(), value);
        watches.push(watcher.map(|watcher| Watch::new(parameter.name.clone(), watcher)));
    }
    Ok(BoundArguments { arguments, watches })
}

/// Runs invocation requests against a shared configuration and transcript.
#[derive(Debug, Clone)]
pub struct FunctionExecutor {
    config: ExecutorConfig,
    log: DiagnosticLog,
}

impl FunctionExecutor {
    pub fn new(config: ExecutorConfig, log: DiagnosticLog) -> Self {
        Self { config, log }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn log(&self) -> &DiagnosticLog {
        &self.log
    }

    /// Executes one request. Failures are reported in the returned result, never raised.
    ///
    /// Blocks the calling thread until the function, including any task it
    /// returns, has completed and every provider has committed.
    pub fn execute(&self, request: InvocationRequest, cancellation: &CancellationToken) -> ExecutionResult {
        let started_at = Utc::now();
        let function_name = request.function_name().to_string();
        self.log.line(format!(
            "Executing: '{}' (pid {}, {})",
            function_name,
            std::process::id(),
            started_at.to_rfc3339_opts(SecondsFormat::Millis, true)
        ));
        info!(function = %function_name, "executing function");

        let outcome = self.run(request, cancellation);
        report_outcome(&self.log, &function_name, started_at, outcome)
    }

    fn run(&self, request: InvocationRequest, cancellation: &CancellationToken) -> Result<Option<Value>, InvocationError> {
        let (function, providers) = request.into_parts();
        let mut parameters = resolve_parameters(function.descriptor(), providers)?;
        let BoundArguments { mut arguments, watches } = bind_parameters(&mut parameters, cancellation)?;
        debug!(function = %function.descriptor().name, parameters = parameters.len(), watches = watches.len(), "parameters bound");
        self.log.lines([PARAMETERS_BOUND_MESSAGE, SEPARATOR]);

        let self_watch = self.start_self_watch(watches);
        let invocation = self.invoke(function.as_ref(), &mut arguments, cancellation);
        self.log.line(SEPARATOR);

        let committed = commit_parameters(&mut parameters, &arguments, cancellation);
        if let Some(self_watch) = self_watch {
            self_watch.stop();
        }

        committed?;
        invocation.map_err(InvocationError::UserFunction)
    }

    fn start_self_watch(&self, watches: Vec<Option<Watch>>) -> Option<SelfWatch> {
        let sink = self.config.watch_sink.clone()?;
        match SelfWatch::start(watches, sink, self.config.watch_interval) {
            Ok(self_watch) => Some(self_watch),
            Err(error) => {
                warn!(error = %error, "self-watch unavailable; continuing without it");
                None
            }
        }
    }

    fn invoke(&self, function: &dyn TargetFunction, arguments: &mut Arguments, cancellation: &CancellationToken) -> Result<Option<Value>, Fault> {
        let name = &function.descriptor().name;
        let outcome = catch_panic(|| match function.invoke(arguments, cancellation)? {
            FunctionReturn::Completed => Ok(None),
            FunctionReturn::Task(task) => block_on_future(task).map_err(|error| Fault::new(RUNTIME_ERROR, error.to_string()))?,
        });

        match outcome {
            Ok(Some(value)) => {
                let shown = truncate_for_display(&redact_sensitive(&value_for_display(&value)));
                info!(function = %name, return_value = %shown, "function task returned a value");
                self.log.line(format!("Return value: {}", shown));
                Ok(Some(value))
            }
            Ok(None) => Ok(None),
            Err(fault) if fault.is_wrapper() => {
                warn!(
                    function = %name,
                    wrapper = %fault.message(),
                    trace = fault.trace().unwrap_or("<none>"),
                    "unwrapping invocation wrapper"
                );
                Err(fault.into_unwrapped())
            }
            Err(fault) => Err(fault),
        }
    }
}

/// Commits and releases every provider in step order.
///
/// The first failure stops the phase; the failing provider is still released.
fn commit_parameters(parameters: &mut [BoundParameter], arguments: &Arguments, cancellation: &CancellationToken) -> Result<(), InvocationError> {
    let keys: Vec<(StepOrder, usize)> = parameters.iter().map(|parameter| (parameter.step_order, parameter.position)).collect();
    for index in commit_sequence(&keys) {
        let parameter = &mut parameters[index];
        let value = &arguments[index];
        if let Err(source) = commit_parameter(parameter, value, cancellation) {
            return Err(InvocationError::Commit {
                parameter: parameter.name.clone(),
                value: truncate_for_display(&redact_sensitive(&value_for_display(value))),
                source,
            });
        }
    }
    Ok(())
}

fn commit_parameter(parameter: &mut BoundParameter, value: &Value, cancellation: &CancellationToken) -> Result<(), Fault> {
    let capabilities = parameter.capabilities;
    if capabilities.commit {
        debug!(parameter = %parameter.name, step_order = %parameter.step_order, "committing parameter");
        if let Err(fault) = catch_panic(|| parameter.provider.commit(value, cancellation)) {
            if capabilities.release
                && let Err(release_fault) = catch_panic(|| parameter.provider.release())
            {
                warn!(parameter = %parameter.name, error = %release_fault, "release after failed commit also failed");
            }
            return Err(fault);
        }
    }
    if capabilities.release {
        catch_panic(|| parameter.provider.release())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConstantProvider, SlotProvider, SyncFunction, ValueSlot};
    use serde_json::json;

    fn descriptor() -> FunctionDescriptor {
        FunctionDescriptor::new("copy").with_parameter("input").with_parameter("output")
    }

    #[test]
    fn resolution_fails_on_missing_provider() {
        let mut providers: IndexMap<String, Box<dyn ValueProvider>> = IndexMap::new();
        providers.insert("input".into(), Box::new(ConstantProvider::new("a")));

        let error = resolve_parameters(&descriptor(), providers).expect_err("output has no provider");
        assert_eq!(error.type_name(), "ResolutionError");
        assert!(error.to_string().contains("'output'"));
    }

    #[test]
    fn resolution_records_mapping_position_and_ignores_extras() {
        let mut providers: IndexMap<String, Box<dyn ValueProvider>> = IndexMap::new();
        providers.insert("extra".into(), Box::new(ConstantProvider::new(1)));
        providers.insert("output".into(), Box::new(SlotProvider::new(ValueSlot::new(Value::Null))));
        providers.insert("input".into(), Box::new(ConstantProvider::new("a")));

        let resolved = resolve_parameters(&descriptor(), providers).expect("resolve");
        let names: Vec<_> = resolved.iter().map(BoundParameter::name).collect();
        assert_eq!(names, vec!["input", "output"]);
        assert!(resolved[1].position() < resolved[0].position());
    }

    #[test]
    fn execute_commits_the_mutated_argument() {
        let slot = ValueSlot::new(Value::Null);
        let function = SyncFunction::new(descriptor(), |arguments: &mut Arguments| {
            let input = arguments.require("input")?.clone();
            arguments.set("output", input);
            Ok(())
        });
        let request = InvocationRequest::new(std::sync::Arc::new(function))
            .with_provider("input", ConstantProvider::new(json!("payload")))
            .with_provider("output", SlotProvider::new(slot.clone()));
        let (log, transcript) = DiagnosticLog::memory();

        let result = FunctionExecutor::new(ExecutorConfig::default(), log).execute(request, &CancellationToken::new());

        assert!(result.is_success(), "{result:?}");
        assert_eq!(slot.get(), json!("payload"));
        let contents = transcript.contents();
        assert!(contents.starts_with("Executing: 'copy' (pid "));
        assert!(contents.contains(PARAMETERS_BOUND_MESSAGE));
        assert!(contents.ends_with("Success\n"));
    }

    #[test]
    fn panics_in_the_function_become_failures() {
        let function = SyncFunction::new(FunctionDescriptor::new("explode"), |_arguments: &mut Arguments| -> Result<(), Fault> {
            panic!("kaboom");
        });
        let (log, _transcript) = DiagnosticLog::memory();
        let result = FunctionExecutor::new(ExecutorConfig::default(), log).execute(
            InvocationRequest::new(std::sync::Arc::new(function)),
            &CancellationToken::new(),
        );

        assert_eq!(result.exception_type, "panic");
        assert_eq!(result.exception_message, "kaboom");
    }

    #[test]
    fn wrapper_faults_report_the_inner_fault() {
        let function = SyncFunction::new(FunctionDescriptor::new("wrapped"), |_arguments: &mut Arguments| {
            Err(Fault::wrapper("task failed", Fault::new("InvalidOperation", "bad state")).with_trace("at dispatch"))
        });
        let (log, transcript) = DiagnosticLog::memory();
        let result = FunctionExecutor::new(ExecutorConfig::default(), log).execute(
            InvocationRequest::new(std::sync::Arc::new(function)),
            &CancellationToken::new(),
        );

        assert_eq!(result.exception_type, "InvalidOperation");
        assert_eq!(result.exception_message, "bad state");
        assert!(!transcript.contents().contains("InvocationWrapper"));
    }
}
