//! Target functions and the arguments handed to them.

use std::ops::{Index, IndexMut};

use futures_util::future::BoxFuture;
use serde_json::Value;
use spindle_types::FunctionDescriptor;
use tokio_util::sync::CancellationToken;

use crate::Fault;

/// Future returned by an asynchronous function. `Some` carries the task's
/// result value; `None` is a task without a result.
pub type TaskFuture<'a> = BoxFuture<'a, Result<Option<Value>, Fault>>;

/// What a function hands back when invoked.
pub enum FunctionReturn<'a> {
    /// The function ran to completion synchronously.
    Completed,
    /// The function started asynchronous work; the executor waits for it.
    Task(TaskFuture<'a>),
}

/// A user-authored function the executor can invoke.
pub trait TargetFunction: Send + Sync {
    /// Name and ordered parameters; argument `i` corresponds to parameter `i`.
    fn descriptor(&self) -> &FunctionDescriptor;

    /// Runs the function body. Mutations of `arguments` are what output
    /// bindings commit afterwards.
    fn invoke<'a>(&'a self, arguments: &'a mut Arguments, cancellation: &'a CancellationToken) -> Result<FunctionReturn<'a>, Fault>;
}

/// Ordered, named argument values for one invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    entries: Vec<(String, Value)>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.entries.push((name.into(), value));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.iter().find(|(entry, _)| entry == name).map(|(_, value)| value)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.entries.iter_mut().find(|(entry, _)| entry == name).map(|(_, value)| value)
    }

    /// Replaces the value bound to `name`. Returns false when no such parameter exists.
    pub fn set(&mut self, name: &str, value: Value) -> bool {
        match self.get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Looks up `name` or reports a fault naming the missing argument.
    pub fn require(&self, name: &str) -> Result<&Value, Fault> {
        self.get(name)
            .ok_or_else(|| Fault::new("ArgumentError", format!("argument '{}' is not bound", name)))
    }

    /// Mutable counterpart of [`require`](Arguments::require).
    pub fn require_mut(&mut self, name: &str) -> Result<&mut Value, Fault> {
        self.get_mut(name)
            .ok_or_else(|| Fault::new("ArgumentError", format!("argument '{}' is not bound", name)))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl Index<usize> for Arguments {
    type Output = Value;

    fn index(&self, index: usize) -> &Value {
        &self.entries[index].1
    }
}

impl IndexMut<usize> for Arguments {
    fn index_mut(&mut self, index: usize) -> &mut Value {
        &mut self.entries[index].1
    }
}

/// Adapts a synchronous closure into a [`TargetFunction`].
pub struct SyncFunction<F> {
    descriptor: FunctionDescriptor,
    body: F,
}

impl<F> SyncFunction<F>
where
    F: Fn(&mut Arguments) -> Result<(), Fault> + Send + Sync,
{
    pub fn new(descriptor: FunctionDescriptor, body: F) -> Self {
        Self { descriptor, body }
    }
}

impl<F> TargetFunction for SyncFunction<F>
where
    F: Fn(&mut Arguments) -> Result<(), Fault> + Send + Sync,
{
    fn descriptor(&self) -> &FunctionDescriptor {
        &self.descriptor
    }

    fn invoke<'a>(&'a self, arguments: &'a mut Arguments, _cancellation: &'a CancellationToken) -> Result<FunctionReturn<'a>, Fault> {
        (self.body)(arguments)?;
        Ok(FunctionReturn::Completed)
    }
}

/// Adapts a closure returning a boxed future into a [`TargetFunction`].
///
/// ```rust
/// use serde_json::json;
/// use spindle_engine::{Arguments, AsyncFunction, TaskFuture};
/// use spindle_types::FunctionDescriptor;
///
/// fn answer(_arguments: &mut Arguments) -> TaskFuture<'_> {
///     Box::pin(async move { Ok(Some(json!(42))) })
/// }
///
/// let function = AsyncFunction::new(FunctionDescriptor::new("answer"), answer);
/// # let _ = function;
/// ```
pub struct AsyncFunction<F> {
    descriptor: FunctionDescriptor,
    body: F,
}

impl<F> AsyncFunction<F>
where
    F: for<'a> Fn(&'a mut Arguments) -> TaskFuture<'a> + Send + Sync,
{
    pub fn new(descriptor: FunctionDescriptor, body: F) -> Self {
        Self { descriptor, body }
    }
}

impl<F> TargetFunction for AsyncFunction<F>
where
    F: for<'a> Fn(&'a mut Arguments) -> TaskFuture<'a> + Send + Sync,
{
    fn descriptor(&self) -> &FunctionDescriptor {
        &self.descriptor
    }

    fn invoke<'a>(&'a self, arguments: &'a mut Arguments, _cancellation: &'a CancellationToken) -> Result<FunctionReturn<'a>, Fault> {
        Ok(FunctionReturn::Task((self.body)(arguments)))
    }
}
