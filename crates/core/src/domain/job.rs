// Job domain model

use serde::{Deserialize, Serialize};

use crate::domain::error::{DomainError, Result};

/// Task identifier within a batch
pub type TaskId = String;

/// Job lifecycle state
///
/// Pending -> Dispatched -> Running -> {Succeeded | Failed | TimedOut}
/// Pending -> Skipped (cooperative cancellation before dispatch)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Pending,
    Dispatched,
    Running,
    Succeeded,
    Failed,
    TimedOut,
    Skipped,
}

impl JobState {
    /// Terminal states are absorbing: no further transition is valid.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Succeeded | JobState::Failed | JobState::TimedOut | JobState::Skipped
        )
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobState::Pending => write!(f, "PENDING"),
            JobState::Dispatched => write!(f, "DISPATCHED"),
            JobState::Running => write!(f, "RUNNING"),
            JobState::Succeeded => write!(f, "SUCCEEDED"),
            JobState::Failed => write!(f, "FAILED"),
            JobState::TimedOut => write!(f, "TIMED_OUT"),
            JobState::Skipped => write!(f, "SKIPPED"),
        }
    }
}

/// Execution mode for a batch (exactly one per batch, no mixing)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionMode {
    /// Shared-memory worker pool; executors run on blocking threads.
    Threaded,
    /// Executors isolate each job in a child OS process; job input and
    /// output are serialized across the process boundary.
    Process,
}

impl Default for ExecutionMode {
    fn default() -> Self {
        ExecutionMode::Threaded
    }
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionMode::Threaded => write!(f, "THREADED"),
            ExecutionMode::Process => write!(f, "PROCESS"),
        }
    }
}

/// One independently-executable unit of work.
///
/// Immutable payload once submitted; only `state` advances, through the
/// checked transition methods. The executor is supplied per batch, not per
/// job, so a `Job` stays plain data.
#[derive(Debug, Clone)]
pub struct Job<T> {
    pub id: TaskId,
    /// Position in the submitted batch; outcomes are re-ordered by this
    /// index when order preservation is requested.
    pub index: usize,
    pub input: T,
    state: JobState,
}

impl<T> Job<T> {
    pub fn new(id: impl Into<TaskId>, index: usize, input: T) -> Self {
        Self {
            id: id.into(),
            index,
            input,
            state: JobState::Pending,
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Transition to Dispatched (submitted to the pool)
    pub fn dispatch(&mut self) -> Result<()> {
        self.transition(JobState::Pending, JobState::Dispatched)
    }

    /// Transition to Running (a worker picked the job up)
    pub fn start(&mut self) -> Result<()> {
        self.transition(JobState::Dispatched, JobState::Running)
    }

    /// Mark as Skipped; only legal while still Pending.
    pub fn skip(&mut self) -> Result<()> {
        self.transition(JobState::Pending, JobState::Skipped)
    }

    fn transition(&mut self, from: JobState, to: JobState) -> Result<()> {
        if self.state != from {
            return Err(DomainError::InvalidStateTransition {
                from: self.state.to_string(),
                to: to.to_string(),
            });
        }
        self.state = to;
        Ok(())
    }
}
