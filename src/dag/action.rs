// src/dag/action.rs

//! Caller-supplied build actions.
//!
//! An [`Action`] is an opaque, zero-argument unit of work returning
//! `anyhow::Result<()>`. It is stored as `FnOnce`, so invoking it consumes
//! it; the executor can never run the same action twice.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use anyhow::{anyhow, Result};

/// Future produced by invoking an [`Action`].
pub type ActionFuture = Pin<Box<dyn Future<Output = Result<()>> + Send + 'static>>;

pub struct Action {
    run: Box<dyn FnOnce() -> ActionFuture + Send + 'static>,
}

impl Action {
    /// Wrap an async closure.
    ///
    /// The action is polled on an arbitrary runtime worker thread. Actions
    /// that must react to cancellation should capture a
    /// [`CancelContext`](crate::context::CancelContext) and observe it.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            run: Box::new(move || Box::pin(f())),
        }
    }

    /// Wrap a synchronous closure; it runs on tokio's blocking pool.
    ///
    /// Use this for actions that shell out or do blocking IO.
    pub fn blocking<F>(f: F) -> Self
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        Self::new(move || async move {
            match tokio::task::spawn_blocking(f).await {
                Ok(result) => result,
                Err(join_err) => Err(anyhow!("blocking action did not complete: {join_err}")),
            }
        })
    }

    /// An action that succeeds immediately (aggregate / phony targets).
    pub fn noop() -> Self {
        Self::new(|| async { Ok(()) })
    }

    pub(crate) fn into_future(self) -> ActionFuture {
        (self.run)()
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action").finish_non_exhaustive()
    }
}
