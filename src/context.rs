// src/context.rs

//! Cancellation context threaded through every dependency wait.
//!
//! A [`CancelContext`] is a cheap, clonable handle. Clones share the same
//! cancellation state; [`CancelContext::child`] and the deadline helpers
//! derive a new context that is cancelled whenever its parent is, but can
//! also be cancelled (or time out) on its own without affecting the parent.
//!
//! Cancellation is broadcast through a `tokio::sync::watch` channel, so any
//! number of tasks can wait on it without polling.

use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::trace;

#[derive(Debug, Clone)]
pub struct CancelContext {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    flag: watch::Sender<bool>,
    /// Effective deadline: the earliest of this context's and its ancestors'.
    deadline: Option<Instant>,
    children: Mutex<Vec<Weak<Inner>>>,
}

impl Inner {
    fn new(deadline: Option<Instant>) -> Self {
        let (flag, _) = watch::channel(false);
        Self {
            flag,
            deadline,
            children: Mutex::new(Vec::new()),
        }
    }

    fn cancel(&self) {
        // The flag must be set before the children lock is taken; `derive`
        // relies on this ordering to never miss a concurrent cancel.
        let newly = !self.flag.send_replace(true);
        if !newly {
            return;
        }

        let children = std::mem::take(
            &mut *self
                .children
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for child in children.iter().filter_map(Weak::upgrade) {
            child.cancel();
        }
    }

    fn is_flagged(&self) -> bool {
        *self.flag.borrow()
    }
}

impl Default for CancelContext {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelContext {
    /// A root context with no deadline.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner::new(None)),
        }
    }

    /// Cancel this context and every context derived from it.
    pub fn cancel(&self) {
        trace!("cancel context cancelled");
        self.inner.cancel();
    }

    /// Non-blocking check: explicitly cancelled or past the deadline.
    pub fn is_cancelled(&self) -> bool {
        self.inner.is_flagged()
            || self
                .inner
                .deadline
                .is_some_and(|deadline| Instant::now() >= deadline)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Derive a context that is cancelled together with `self`.
    pub fn child(&self) -> Self {
        self.derive(self.inner.deadline)
    }

    /// Derive a child that also cancels itself after `timeout`.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derive a child that also cancels itself at `deadline`.
    ///
    /// A parent deadline that is earlier wins.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let effective = match self.inner.deadline {
            Some(parent) => parent.min(deadline),
            None => deadline,
        };
        self.derive(Some(effective))
    }

    /// Resolves once the context is cancelled or its deadline passes.
    ///
    /// Resolves immediately if that already happened.
    pub async fn cancelled(&self) {
        let mut rx = self.inner.flag.subscribe();
        let flagged = async move {
            // The sender lives in `self.inner`, so this only returns once the
            // flag is set.
            let _ = rx.wait_for(|cancelled| *cancelled).await;
        };

        match self.inner.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = flagged => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => flagged.await,
        }
    }

    fn derive(&self, deadline: Option<Instant>) -> Self {
        let child = Arc::new(Inner::new(deadline));
        {
            let mut children = self
                .inner
                .children
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            children.retain(|weak| weak.strong_count() > 0);

            if self.inner.is_flagged() {
                child.cancel();
            } else {
                children.push(Arc::downgrade(&child));
            }
        }
        Self { inner: child }
    }
}
