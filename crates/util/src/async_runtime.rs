//! Async runtime helpers for blocking callers.
//!
//! The executor is synchronous: when a function hands back a future, the
//! calling thread waits for it here. The current Tokio runtime is reused when
//! one is available.

use std::future::Future;

use anyhow::{anyhow, bail};
use tokio::runtime::{Handle, RuntimeFlavor};

/// Run `future` to completion on the calling thread.
///
/// # Returns
/// The future's output, or an error when no runtime can drive it.
///
/// # Notes
/// - Inside a multi-threaded Tokio runtime the worker is marked as blocking
///   and the ambient runtime drives the future.
/// - A current-thread runtime cannot be blocked from within itself, so that
///   case is reported as an error instead of deadlocking.
/// - Outside Tokio a single-threaded runtime is built for the call.
pub fn block_on_future<F>(future: F) -> anyhow::Result<F::Output>
where
    F: Future,
{
    if let Ok(handle) = Handle::try_current() {
        if handle.runtime_flavor() != RuntimeFlavor::MultiThread {
            bail!("cannot block on a future from inside a current-thread runtime");
        }
        Ok(tokio::task::block_in_place(|| handle.block_on(future)))
    } else {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|error| anyhow!(error))?;
        Ok(runtime.block_on(future))
    }
}
