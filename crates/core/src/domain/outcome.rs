// Outcome and batch result models

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::job::{JobState, TaskId};

/// Classifies how a job failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// The executor returned an error for this input.
    Executor,
    /// The per-job deadline elapsed before the executor finished.
    Timeout,
    /// The executor panicked; caught at the wrapper boundary.
    Panic,
    /// Cancellation was requested before this job was dispatched.
    Skipped,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Executor => write!(f, "EXECUTOR"),
            ErrorKind::Timeout => write!(f, "TIMEOUT"),
            ErrorKind::Panic => write!(f, "PANIC"),
            ErrorKind::Skipped => write!(f, "SKIPPED"),
        }
    }
}

/// Tagged job-failure value. Executors return this instead of raising;
/// the scheduler folds it straight into an `Outcome`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorInfo {
    pub fn executor(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Executor,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Timeout,
            message: message.into(),
        }
    }

    pub fn panic(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Panic,
            message: message.into(),
        }
    }

    pub fn skipped(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Skipped,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

/// Bookkeeping captured by the worker wrapper around one execution.
#[derive(Debug, Clone, Default)]
pub struct ExecutionStamp {
    /// Epoch ms when the worker began executing the job.
    pub started_at_ms: i64,
    /// Epoch ms when the job reached a terminal state.
    pub finished_at_ms: i64,
    pub duration: Duration,
    /// `pid-threadid` of the worker that ran the job; None for skipped jobs.
    pub worker_id: Option<String>,
    /// Change in process resident memory across the job, when the probe
    /// could measure it.
    pub memory_delta_mb: Option<f64>,
}

/// Terminal record describing how one job ended.
///
/// Exactly one of `value` / `error` is populated; the constructors are the
/// only creation path and uphold that.
#[derive(Debug, Clone)]
pub struct Outcome<R> {
    pub task_id: TaskId,
    /// Index of the job in the submitted batch.
    pub original_index: usize,
    /// Terminal state: Succeeded, Failed, TimedOut or Skipped.
    pub state: JobState,
    pub value: Option<R>,
    pub error: Option<ErrorInfo>,
    pub stamp: ExecutionStamp,
}

impl<R> Outcome<R> {
    pub fn succeeded(task_id: TaskId, original_index: usize, value: R, stamp: ExecutionStamp) -> Self {
        Self {
            task_id,
            original_index,
            state: JobState::Succeeded,
            value: Some(value),
            error: None,
            stamp,
        }
    }

    pub fn failed(task_id: TaskId, original_index: usize, error: ErrorInfo, stamp: ExecutionStamp) -> Self {
        let state = match error.kind {
            ErrorKind::Timeout => JobState::TimedOut,
            ErrorKind::Skipped => JobState::Skipped,
            _ => JobState::Failed,
        };
        Self {
            task_id,
            original_index,
            state,
            value: None,
            error: Some(error),
            stamp,
        }
    }

    pub fn skipped(task_id: TaskId, original_index: usize) -> Self {
        Self::failed(
            task_id,
            original_index,
            ErrorInfo::skipped("cancelled before dispatch"),
            ExecutionStamp::default(),
        )
    }

    pub fn success(&self) -> bool {
        self.state == JobState::Succeeded
    }
}

/// The result of one batch call: one `Outcome` per submitted job, never
/// more, never fewer.
#[derive(Debug)]
pub struct BatchResult<R> {
    outcomes: Vec<Outcome<R>>,
}

impl<R> BatchResult<R> {
    pub fn new(outcomes: Vec<Outcome<R>>) -> Self {
        Self { outcomes }
    }

    pub fn empty() -> Self {
        Self { outcomes: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Outcome<R>> {
        self.outcomes.iter()
    }

    pub fn succeeded_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.succeeded_count()
    }

    /// Successful values in submission-index order, regardless of how the
    /// batch was assembled.
    pub fn successful_values(&self) -> impl Iterator<Item = &R> {
        let mut succeeded: Vec<&Outcome<R>> =
            self.outcomes.iter().filter(|o| o.success()).collect();
        succeeded.sort_by_key(|o| o.original_index);
        succeeded.into_iter().filter_map(|o| o.value.as_ref())
    }

    pub fn into_outcomes(self) -> Vec<Outcome<R>> {
        self.outcomes
    }

    pub fn outcomes(&self) -> &[Outcome<R>] {
        &self.outcomes
    }
}

impl<R> IntoIterator for BatchResult<R> {
    type Item = Outcome<R>;
    type IntoIter = std::vec::IntoIter<Outcome<R>>;

    fn into_iter(self) -> Self::IntoIter {
        self.outcomes.into_iter()
    }
}
