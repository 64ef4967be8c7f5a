//! Shared type definitions for the Spindle invocation runtime.
//!
//! These are plain data records exchanged between the engine, the host CLI,
//! and whatever collaborator produces invocation requests. Nothing in this
//! crate performs I/O.

pub mod function;
pub mod manifest;
pub mod result;

pub use function::{FunctionDescriptor, ParameterDescriptor, StepOrder};
pub use manifest::{BindingKind, InvocationManifest, ParameterBinding};
pub use result::{ExecutionResult, TransportDetails};
