// Job Executor Port
// Abstraction for executing one unit of work (in-thread or subprocess)

use thiserror::Error;

/// Execution errors
///
/// Returned by executors for a single input; the scheduler records them as
/// failed outcomes and keeps the batch running.
#[derive(Error, Debug, Clone)]
pub enum ExecError {
    #[error("Execution failed: {0}")]
    Failed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Spawn failed: {0}")]
    SpawnFailed(String),

    #[error("IO error: {0}")]
    Io(String),
}

/// Job executor trait
///
/// Implementations:
/// - Closures over in-memory work (threaded execution mode)
/// - SubprocessExecutor: one child process per job (process execution mode)
///
/// `execute` runs on the blocking pool; it may block freely but must not
/// assume a tokio context.
pub trait JobExecutor<T, R>: Send + Sync {
    /// Execute one job input and produce its result.
    ///
    /// # Errors
    /// Any `ExecError`; the error is folded into that job's outcome and
    /// never aborts the batch.
    fn execute(&self, input: &T) -> Result<R, ExecError>;

    /// True when each job runs in its own OS process.
    ///
    /// Batches requesting process execution mode refuse executors that
    /// return false here.
    fn supports_process_isolation(&self) -> bool {
        false
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Closure-backed executor for testing
    ///
    /// # Example
    /// ```text
    /// let double = FnJobExecutor::new(|n: &u64| Ok(n * 2));
    /// let flaky = FnJobExecutor::new(|n: &u64| {
    ///     if n % 5 == 0 {
    ///         Err(ExecError::Failed(format!("job {n} rejected")))
    ///     } else {
    ///         Ok(*n)
    ///     }
    /// });
    /// ```
    pub struct FnJobExecutor<F> {
        f: F,
        process_isolation: bool,
        call_count: Arc<Mutex<usize>>,
    }

    impl<F> FnJobExecutor<F> {
        pub fn new(f: F) -> Self {
            Self {
                f,
                process_isolation: false,
                call_count: Arc::new(Mutex::new(0)),
            }
        }

        /// Pretend this executor isolates jobs in processes (capability
        /// checks only; execution stays in-thread).
        pub fn with_process_isolation(mut self) -> Self {
            self.process_isolation = true;
            self
        }

        pub fn call_count(&self) -> usize {
            *self.call_count.lock().unwrap()
        }
    }

    impl<T, R, F> JobExecutor<T, R> for FnJobExecutor<F>
    where
        F: Fn(&T) -> Result<R, ExecError> + Send + Sync,
    {
        fn execute(&self, input: &T) -> Result<R, ExecError> {
            *self.call_count.lock().unwrap() += 1;
            (self.f)(input)
        }

        fn supports_process_isolation(&self) -> bool {
            self.process_isolation
        }
    }
}
