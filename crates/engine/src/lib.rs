//! # Spindle Engine
//!
//! The Spindle Engine invokes user-authored functions against bound parameter
//! values and commits their outputs in a deterministic order.
//!
//! ## Key Features
//!
//! - **Parameter binding**: every declared parameter is resolved to a [`ValueProvider`]
//! - **Sync and async functions**: tasks returned by a function are awaited before commit
//! - **Ordered commits**: outputs commit by [`StepOrder`](spindle_types::StepOrder), enqueue-style bindings last
//! - **Self-watch**: per-parameter diagnostics sampled on a background thread
//! - **Uniform results**: every failure ends up in an [`ExecutionResult`](spindle_types::ExecutionResult)
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use serde_json::json;
//! use spindle_engine::{
//!     Arguments, ConstantProvider, DiagnosticLog, ExecutorConfig, FunctionExecutor, InvocationRequest, SlotProvider, SyncFunction,
//!     ValueSlot,
//! };
//! use spindle_types::FunctionDescriptor;
//! use tokio_util::sync::CancellationToken;
//!
//! let descriptor = FunctionDescriptor::new("greet").with_parameter("name").with_parameter("greeting");
//! let function = SyncFunction::new(descriptor, |arguments: &mut Arguments| {
//!     let name = arguments.require("name")?.as_str().unwrap_or("world").to_string();
//!     arguments.set("greeting", json!(format!("Hello, {name}!")));
//!     Ok(())
//! });
//!
//! let greeting = ValueSlot::new(serde_json::Value::Null);
//! let request = InvocationRequest::new(Arc::new(function))
//!     .with_provider("name", ConstantProvider::new("Ada"))
//!     .with_provider("greeting", SlotProvider::new(greeting.clone()));
//!
//! let (log, _transcript) = DiagnosticLog::memory();
//! let result = FunctionExecutor::new(ExecutorConfig::default(), log).execute(request, &CancellationToken::new());
//!
//! assert!(result.is_success());
//! assert_eq!(greeting.get(), json!("Hello, Ada!"));
//! ```
//!
//! ## Architecture
//!
//! - **`provider`**: The provider contract and the built-in generic bindings
//! - **`function`**: Target functions, their arguments, and sync/async adapters
//! - **`step_order`**: Commit ordering
//! - **`watch`**: Self-watch sampler and snapshot sinks
//! - **`executor`**: The resolve/bind/invoke/commit pipeline
//! - **`report`**: Execution results and the failure transcript

pub mod config;
pub mod diagnostics;
pub mod executor;
pub mod fault;
pub mod function;
pub mod provider;
pub mod report;
pub mod request;
pub mod step_order;
pub mod watch;

pub use config::ExecutorConfig;
pub use diagnostics::{DiagnosticLog, MemoryTranscript};
pub use executor::{FunctionExecutor, InvocationError};
pub use fault::{Fault, FaultKind, catch_panic};
pub use function::{Arguments, AsyncFunction, FunctionReturn, SyncFunction, TargetFunction, TaskFuture};
pub use provider::{
    BatchCollector, CollectorProvider, ConstantProvider, FileProvider, JsonLinesTarget, MemoryTarget, OutputTarget, ProviderCapabilities,
    SlotProvider, StreamProgress, ValueProvider, ValueSlot, WatchableReader, WatchableWriter,
};
pub use request::InvocationRequest;
pub use watch::{FileWatchSink, MemoryWatchSink, SelfWatch, Watch, WatchSink, WatchSnapshot, Watcher};
