// Worker instrumentation handle
//
// Owned by the caller and passed in per batch; the scheduler records into
// it through a cloned handle. Never a process-wide singleton.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::domain::TaskId;

#[derive(Default)]
struct TrackerState {
    /// (task id, worker id) in dispatch-completion order
    assignments: Vec<(TaskId, String)>,
    active: usize,
    high_water: usize,
}

/// Records which worker ran which job and the concurrency high-water mark.
#[derive(Clone, Default)]
pub struct WorkerTracker {
    state: Arc<Mutex<TrackerState>>,
}

impl WorkerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn job_assigned(&self, task_id: &str, worker_id: &str) {
        let mut state = self.state.lock().unwrap();
        state.assignments.push((task_id.to_string(), worker_id.to_string()));
        state.active += 1;
        state.high_water = state.high_water.max(state.active);
    }

    pub fn job_released(&self) {
        let mut state = self.state.lock().unwrap();
        state.active = state.active.saturating_sub(1);
    }

    /// Peak number of jobs running at once
    pub fn high_water(&self) -> usize {
        self.state.lock().unwrap().high_water
    }

    pub fn assignments(&self) -> Vec<(TaskId, String)> {
        self.state.lock().unwrap().assignments.clone()
    }

    pub fn distinct_workers(&self) -> usize {
        let state = self.state.lock().unwrap();
        state
            .assignments
            .iter()
            .map(|(_, w)| w.as_str())
            .collect::<HashSet<_>>()
            .len()
    }
}

/// `pid-threadid` label for the current worker thread.
pub fn worker_ident() -> String {
    let thread_id = format!("{:?}", std::thread::current().id());
    let digits: String = thread_id.chars().filter(|c| c.is_ascii_digit()).collect();
    format!("{}-{}", std::process::id(), digits)
}
