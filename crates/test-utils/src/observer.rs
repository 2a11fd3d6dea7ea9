use std::sync::{Arc, Mutex};

use buildgraph::{ExecutionObserver, TargetEvent};

/// Observer that keeps every event it receives, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    events: Arc<Mutex<Vec<TargetEvent>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TargetEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Events for one target, in arrival order.
    pub fn events_for(&self, target: &str) -> Vec<TargetEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.target() == target)
            .collect()
    }

    pub fn terminal_events_for(&self, target: &str) -> Vec<TargetEvent> {
        self.events_for(target)
            .into_iter()
            .filter(TargetEvent::is_terminal)
            .collect()
    }
}

impl ExecutionObserver for RecordingObserver {
    fn on_event(&self, event: &TargetEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
