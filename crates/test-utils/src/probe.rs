use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use buildgraph::{Action, CancelContext};

/// What one target's probe action observed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProbeRecord {
    pub invocations: usize,
    /// Global sequence number taken when the action started.
    pub started_seq: Option<u64>,
    /// Global sequence number taken when the action finished.
    pub finished_seq: Option<u64>,
}

#[derive(Debug, Default)]
struct ProbeState {
    next_seq: u64,
    records: HashMap<String, ProbeRecord>,
}

/// Hands out instrumented actions and records when each one ran.
///
/// Sequence numbers come from a single counter, so "A finished before B
/// started" is `finished_seq(A) < started_seq(B)`.
#[derive(Debug, Clone, Default)]
pub struct ActionProbe {
    state: Arc<Mutex<ProbeState>>,
    running: Arc<AtomicUsize>,
    max_running: Arc<AtomicUsize>,
}

impl ActionProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Action that succeeds immediately.
    pub fn succeed(&self, name: &str) -> Action {
        self.build(name, None, None, None)
    }

    /// Action that fails immediately with `"<name> failed"`.
    pub fn fail(&self, name: &str) -> Action {
        self.build(name, None, Some(format!("{name} failed")), None)
    }

    /// Action that sleeps for `delay`, then succeeds.
    pub fn slow(&self, name: &str, delay: Duration) -> Action {
        self.build(name, Some(delay), None, None)
    }

    /// Action that sleeps for `delay`, then fails.
    pub fn slow_fail(&self, name: &str, delay: Duration) -> Action {
        self.build(name, Some(delay), Some(format!("{name} failed")), None)
    }

    /// Action that sleeps for `delay` but gives up with an error as soon as
    /// `ctx` is cancelled.
    pub fn cancellable(&self, name: &str, delay: Duration, ctx: CancelContext) -> Action {
        self.build(name, Some(delay), None, Some(ctx))
    }

    pub fn record(&self, name: &str) -> ProbeRecord {
        self.state
            .lock()
            .unwrap()
            .records
            .get(name)
            .copied()
            .unwrap_or_default()
    }

    pub fn invocations(&self, name: &str) -> usize {
        self.record(name).invocations
    }

    pub fn ran(&self, name: &str) -> bool {
        self.invocations(name) > 0
    }

    /// `true` if `first` finished before `second` started.
    pub fn finished_before_start(&self, first: &str, second: &str) -> bool {
        match (self.record(first).finished_seq, self.record(second).started_seq) {
            (Some(done), Some(start)) => done < start,
            _ => false,
        }
    }

    /// Highest number of probe actions observed running at the same time.
    pub fn max_concurrency(&self) -> usize {
        self.max_running.load(Ordering::SeqCst)
    }

    fn build(
        &self,
        name: &str,
        delay: Option<Duration>,
        failure: Option<String>,
        ctx: Option<CancelContext>,
    ) -> Action {
        let probe = self.clone();
        let name = name.to_string();

        Action::new(move || async move {
            probe.on_start(&name);

            if let Some(delay) = delay {
                match &ctx {
                    Some(ctx) => {
                        tokio::select! {
                            _ = tokio::time::sleep(delay) => {}
                            _ = ctx.cancelled() => {
                                probe.on_finish(&name);
                                return Err(anyhow!("{name} interrupted"));
                            }
                        }
                    }
                    None => tokio::time::sleep(delay).await,
                }
            }

            probe.on_finish(&name);
            match failure {
                Some(msg) => Err(anyhow!(msg)),
                None => Ok(()),
            }
        })
    }

    fn on_start(&self, name: &str) {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(now, Ordering::SeqCst);

        let mut state = self.state.lock().unwrap();
        let seq = state.next_seq;
        state.next_seq += 1;
        let record = state.records.entry(name.to_string()).or_default();
        record.invocations += 1;
        record.started_seq = Some(seq);
    }

    fn on_finish(&self, name: &str) {
        self.running.fetch_sub(1, Ordering::SeqCst);

        let mut state = self.state.lock().unwrap();
        let seq = state.next_seq;
        state.next_seq += 1;
        state.records.entry(name.to_string()).or_default().finished_seq = Some(seq);
    }
}
