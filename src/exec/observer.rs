// src/exec/observer.rs

//! Optional observer hook for presentation layers.
//!
//! The executor reports every target transition through an
//! [`ExecutionObserver`] without the observer taking part in scheduling.
//! Progress bars, spinners or structured logs plug in here.

use std::time::Duration;

use tracing::{info, warn};

use crate::errors::TargetFailure;
use crate::types::TargetName;

/// A target transition reported to observers.
///
/// Every target produces exactly one terminal event (`Succeeded`, `Failed` or
/// `Skipped`) per execution; `Started` precedes `Succeeded`/`Failed` only.
#[derive(Debug, Clone)]
pub enum TargetEvent {
    /// The action is about to run.
    Started { target: TargetName },
    Succeeded {
        target: TargetName,
        duration: Duration,
    },
    /// The action ran and failed.
    Failed {
        target: TargetName,
        duration: Duration,
        error: TargetFailure,
    },
    /// The action never ran (failed dependency or cancellation).
    Skipped {
        target: TargetName,
        cause: TargetFailure,
    },
}

impl TargetEvent {
    pub fn target(&self) -> &str {
        match self {
            TargetEvent::Started { target }
            | TargetEvent::Succeeded { target, .. }
            | TargetEvent::Failed { target, .. }
            | TargetEvent::Skipped { target, .. } => target,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TargetEvent::Started { .. })
    }
}

/// Receives target transitions.
///
/// Called from arbitrary runtime threads, never while an executor lock is
/// held. Implementations should return quickly.
pub trait ExecutionObserver: Send + Sync {
    fn on_event(&self, event: &TargetEvent);
}

impl<F> ExecutionObserver for F
where
    F: Fn(&TargetEvent) + Send + Sync,
{
    fn on_event(&self, event: &TargetEvent) {
        self(event)
    }
}

/// Observer that renders transitions as `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl ExecutionObserver for LoggingObserver {
    fn on_event(&self, event: &TargetEvent) {
        match event {
            TargetEvent::Started { target } => {
                info!(target_name = %target, "building");
            }
            TargetEvent::Succeeded { target, duration } => {
                info!(
                    target_name = %target,
                    duration_ms = duration.as_millis() as u64,
                    "built"
                );
            }
            TargetEvent::Failed {
                target,
                duration,
                error,
            } => {
                warn!(
                    target_name = %target,
                    duration_ms = duration.as_millis() as u64,
                    error = %error,
                    "build failed"
                );
            }
            TargetEvent::Skipped { target, cause } => {
                warn!(
                    target_name = %target,
                    phase = %cause.phase(),
                    cause = %cause,
                    "skipped"
                );
            }
        }
    }
}
