//! Linked failure chains.
//!
//! A [`Fault`] is the error currency between the engine and its collaborators
//! (providers, functions, watchers). Each link carries a type name and a
//! message, an optional trace, and a [`FaultKind`] tag; causes are boxed links
//! walked iteratively by the reporter. Transport failures carry their extended
//! details on the tag instead of being detected by type inspection.

use std::{
    any::Any,
    backtrace::{Backtrace, BacktraceStatus},
    cell::RefCell,
    error::Error as StdError,
    panic::{self, AssertUnwindSafe},
    sync::Once,
};

use spindle_types::TransportDetails;
use thiserror::Error;

/// Classifies a single link in a fault chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FaultKind {
    #[default]
    General,
    /// Produced by the invocation mechanism around the user's own failure.
    /// The executor reports the inner cause instead.
    Wrapper,
    /// Storage or queue layer failure with extended service details.
    Transport(TransportDetails),
}

/// A failure with an optional chain of causes.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct Fault {
    type_name: String,
    message: String,
    kind: FaultKind,
    trace: Option<String>,
    #[source]
    cause: Option<Box<Fault>>,
}

impl Fault {
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
            kind: FaultKind::General,
            trace: None,
            cause: None,
        }
    }

    /// Creates a transport-layer fault carrying extended service details.
    pub fn transport(type_name: impl Into<String>, message: impl Into<String>, details: TransportDetails) -> Self {
        Self {
            kind: FaultKind::Transport(details),
            ..Self::new(type_name, message)
        }
    }

    /// Wraps `inner` the way an invocation mechanism would (task join, dispatch shim).
    pub fn wrapper(message: impl Into<String>, inner: Fault) -> Self {
        Self {
            kind: FaultKind::Wrapper,
            ..Self::new("InvocationWrapper", message)
        }
        .with_cause(inner)
    }

    /// Converts a panic payload caught around user code.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(text) = payload.downcast_ref::<&str>() {
            (*text).to_string()
        } else if let Some(text) = payload.downcast_ref::<String>() {
            text.clone()
        } else {
            "panic with a non-string payload".to_string()
        };
        Self::new("panic", message)
    }

    /// Converts any standard error, keeping its `source()` chain as causes.
    ///
    /// The outermost link is named after `E`; causes are only known through
    /// `dyn Error` and are named `Error`.
    pub fn from_error<E: StdError>(error: &E) -> Self {
        let mut messages = vec![error.to_string()];
        let mut source = error.source();
        while let Some(current) = source {
            messages.push(current.to_string());
            source = current.source();
        }
        Self::from_messages(short_type_name::<E>(), messages)
    }

    fn from_messages(outer_type: &str, messages: Vec<String>) -> Self {
        let mut chain: Option<Fault> = None;
        for (index, message) in messages.into_iter().enumerate().rev() {
            let type_name = if index == 0 { outer_type } else { "Error" };
            let mut link = Fault::new(type_name, message);
            link.cause = chain.take().map(Box::new);
            chain = Some(link);
        }
        chain.unwrap_or_else(|| Fault::new(outer_type, String::new()))
    }

    pub fn with_cause(mut self, cause: Fault) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.trace = Some(trace.into());
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &FaultKind {
        &self.kind
    }

    pub fn trace(&self) -> Option<&str> {
        self.trace.as_deref()
    }

    pub fn cause(&self) -> Option<&Fault> {
        self.cause.as_deref()
    }

    pub fn transport_details(&self) -> Option<&TransportDetails> {
        match &self.kind {
            FaultKind::Transport(details) => Some(details),
            _ => None,
        }
    }

    pub fn is_wrapper(&self) -> bool {
        self.kind == FaultKind::Wrapper
    }

    /// Iterates this link followed by every cause, outermost first.
    pub fn chain(&self) -> FaultChain<'_> {
        FaultChain { next: Some(self) }
    }

    /// Strips invocation wrappers until the user's own fault is on top.
    ///
    /// A wrapper without a cause is kept as-is.
    pub fn into_unwrapped(self) -> Fault {
        let mut current = self;
        while current.is_wrapper() {
            match current.cause.take() {
                Some(inner) => current = *inner,
                None => break,
            }
        }
        current
    }
}

impl From<anyhow::Error> for Fault {
    fn from(error: anyhow::Error) -> Self {
        match error.downcast::<Fault>() {
            Ok(fault) => fault,
            Err(error) => {
                let messages = error.chain().map(ToString::to_string).collect();
                Fault::from_messages("Error", messages)
            }
        }
    }
}

impl From<std::io::Error> for Fault {
    fn from(error: std::io::Error) -> Self {
        Fault::from_error(&error)
    }
}

impl From<serde_json::Error> for Fault {
    fn from(error: serde_json::Error) -> Self {
        Fault::from_error(&error)
    }
}

thread_local! {
    static PANIC_TRACE: RefCell<Option<String>> = const { RefCell::new(None) };
}

static PANIC_TRACE_HOOK: Once = Once::new();

/// Chains a panic hook (once per process) that records the panicking thread's
/// backtrace before the previously installed hook runs.
fn install_panic_trace_hook() {
    PANIC_TRACE_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let backtrace = Backtrace::capture();
            if backtrace.status() == BacktraceStatus::Captured {
                let _ = PANIC_TRACE.try_with(|slot| *slot.borrow_mut() = Some(backtrace.to_string()));
            }
            previous(info);
        }));
    });
}

/// Runs `operation`, turning a panic into a `panic` fault.
///
/// The fault carries the backtrace taken where the panic happened when
/// backtraces are enabled (`RUST_BACKTRACE` / `RUST_LIB_BACKTRACE`).
pub fn catch_panic<T>(operation: impl FnOnce() -> Result<T, Fault>) -> Result<T, Fault> {
    install_panic_trace_hook();
    take_panic_trace();
    panic::catch_unwind(AssertUnwindSafe(operation)).unwrap_or_else(|payload| {
        let fault = Fault::from_panic(payload);
        Err(match take_panic_trace() {
            Some(trace) => fault.with_trace(trace),
            None => fault,
        })
    })
}

fn take_panic_trace() -> Option<String> {
    PANIC_TRACE.try_with(|slot| slot.borrow_mut().take()).ok().flatten()
}

/// Iterator over the links of a [`Fault`], outermost first.
#[derive(Debug, Clone)]
pub struct FaultChain<'a> {
    next: Option<&'a Fault>,
}

impl<'a> Iterator for FaultChain<'a> {
    type Item = &'a Fault;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.cause();
        Some(current)
    }
}

/// Last path segment of a type name, without generic arguments.
fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let without_generics = full.split('<').next().unwrap_or(full);
    without_generics.rsplit("::").next().unwrap_or(without_generics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct Outer(std::io::Error);

    impl fmt::Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("could not load blob")
        }
    }

    impl StdError for Outer {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn from_error_keeps_source_chain() {
        let error = Outer(std::io::Error::other("connection reset"));
        let fault = Fault::from_error(&error);
        let links: Vec<(&str, &str)> = fault.chain().map(|link| (link.type_name(), link.message())).collect();
        assert_eq!(links, vec![("Outer", "could not load blob"), ("Error", "connection reset")]);
        assert!(fault.source().is_some());
    }

    #[test]
    fn anyhow_context_becomes_causes() {
        let error = anyhow::anyhow!("disk full").context("writing queue file");
        let fault = Fault::from(error);
        let messages: Vec<&str> = fault.chain().map(Fault::message).collect();
        assert_eq!(messages, vec!["writing queue file", "disk full"]);
    }

    #[test]
    fn anyhow_wrapping_a_fault_returns_it_unchanged() {
        let original = Fault::new("QueueFull", "queue is full");
        let fault = Fault::from(anyhow::Error::new(original));
        assert_eq!(fault.type_name(), "QueueFull");
    }

    #[test]
    fn into_unwrapped_strips_nested_wrappers() {
        let user = Fault::new("ValidationError", "order id missing");
        let wrapped = Fault::wrapper("task failed", Fault::wrapper("dispatch failed", user));
        let unwrapped = wrapped.into_unwrapped();
        assert_eq!(unwrapped.type_name(), "ValidationError");
        assert!(!unwrapped.is_wrapper());
    }

    #[test]
    fn transport_details_are_exposed_on_the_link() {
        let details = TransportDetails::new("BlobNotFound", "The specified blob does not exist.");
        let fault = Fault::new("CommitError", "upload failed").with_cause(Fault::transport("StorageError", "404", details.clone()));
        let transport: Vec<&TransportDetails> = fault.chain().filter_map(Fault::transport_details).collect();
        assert_eq!(transport, vec![&details]);
    }

    #[inline(never)]
    fn failing_order_lookup() -> Result<u32, Fault> {
        let orders: Vec<u32> = Vec::new();
        Ok(orders[3])
    }

    #[test]
    fn catch_panic_reports_the_panic_site() {
        let fault = catch_panic(failing_order_lookup).expect_err("lookup panics");
        assert_eq!(fault.type_name(), "panic");
        assert!(fault.message().contains("index out of bounds"), "{}", fault.message());
        if let Some(trace) = fault.trace() {
            assert!(trace.contains("failing_order_lookup"), "trace misses the panicking frame:\n{trace}");
        }
        assert!(take_panic_trace().is_none(), "trace must not leak into the next capture");
    }

    #[test]
    fn catch_panic_passes_results_through() {
        assert_eq!(catch_panic(|| Ok::<_, Fault>(7)).expect("ok"), 7);
        let fault = catch_panic(|| Err::<(), _>(Fault::new("QueueFull", "queue is full"))).expect_err("err");
        assert_eq!(fault.type_name(), "QueueFull");
        assert!(fault.trace().is_none());
    }

    #[test]
    fn panic_payloads_become_messages() {
        let fault = Fault::from_panic(Box::new("index out of bounds"));
        assert_eq!(fault.type_name(), "panic");
        assert_eq!(fault.message(), "index out of bounds");
        let fault = Fault::from_panic(Box::new(String::from("owned message")));
        assert_eq!(fault.message(), "owned message");
    }
}
