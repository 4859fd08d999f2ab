//! Task scheduler - runs a batch of independent jobs across a bounded,
//! resource-adaptive worker pool
//!
//! - Pool size derived once per batch from live resource pressure
//! - One outcome per job, regardless of how it terminates
//! - Per-job timeouts reclaim the worker slot; no preemptive kill
//! - Cooperative cancellation between dispatches

pub mod cancel;
pub mod constants;
pub mod policy;
pub mod tracker;

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::application::monitor::{MonitorConfig, ResourceMonitor};
use crate::application::perf::PerfMonitor;
use crate::application::progress::{ProgressCallback, ProgressConfig, ProgressTracker};
use crate::domain::{
    BatchResult, ErrorInfo, ExecutionMode, ExecutionStamp, Job, Outcome, TaskId,
};
use crate::error::{EngineError, Result};
use crate::port::{ExecError, JobExecutor, ResourceProbe, TimeProvider};

pub use cancel::{cancel_channel, CancelHandle, CancelToken};
pub use tracker::WorkerTracker;

use constants::{default_max_workers, DEFAULT_MIN_WORKERS};
use policy::select_worker_count;

/// Scheduler configuration
#[derive(Clone)]
pub struct SchedulerConfig {
    pub min_workers: usize,
    pub max_workers: usize,
    /// When false, pressure readings are ignored and the pool always
    /// opens at `max_workers`.
    pub adaptive: bool,
    pub monitor: MonitorConfig,
    pub progress: ProgressConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            min_workers: DEFAULT_MIN_WORKERS,
            max_workers: default_max_workers(),
            adaptive: true,
            monitor: MonitorConfig::default(),
            progress: ProgressConfig::default(),
        }
    }
}

/// Per-batch options
#[derive(Clone)]
pub struct BatchOptions {
    /// Per-job deadline; None runs unbounded
    pub timeout: Option<Duration>,
    /// Place outcomes at their submission index instead of completion
    /// order; on by default
    pub preserve_order: bool,
    pub mode: ExecutionMode,
    /// Pool upper bound for this batch only; the configured bound is
    /// untouched
    pub max_workers: Option<usize>,
    pub cancel: Option<CancelToken>,
    /// Caller-owned instrumentation handle
    pub tracker: Option<WorkerTracker>,
    pub perf: Option<Arc<PerfMonitor>>,
    pub on_progress: Option<ProgressCallback>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            preserve_order: true,
            mode: ExecutionMode::default(),
            max_workers: None,
            cancel: None,
            tracker: None,
            perf: None,
            on_progress: None,
        }
    }
}

impl BatchOptions {
    /// Outcomes in completion order instead of submission order.
    pub fn completion_order() -> Self {
        Self {
            preserve_order: false,
            ..Self::default()
        }
    }
}

/// Build a job list from raw values and optional explicit task ids.
///
/// Default ids are `task-{index}`. An id list of the wrong length is a
/// scheduling error; nothing is partially built.
pub fn make_jobs<T>(values: Vec<T>, task_ids: Option<Vec<TaskId>>) -> Result<Vec<Job<T>>> {
    if let Some(ids) = &task_ids {
        if ids.len() != values.len() {
            return Err(EngineError::Scheduling(format!(
                "task id count ({}) does not match job count ({})",
                ids.len(),
                values.len()
            )));
        }
    }

    Ok(values
        .into_iter()
        .enumerate()
        .map(|(i, value)| {
            let id = match &task_ids {
                Some(ids) => ids[i].clone(),
                None => format!("task-{i}"),
            };
            Job::new(id, i, value)
        })
        .collect())
}

/// Executes batches of jobs with bounded, adaptive concurrency.
pub struct TaskScheduler {
    probe: Arc<dyn ResourceProbe>,
    time: Arc<dyn TimeProvider>,
    config: SchedulerConfig,
}

impl TaskScheduler {
    pub fn new(
        probe: Arc<dyn ResourceProbe>,
        time: Arc<dyn TimeProvider>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            probe,
            time,
            config,
        }
    }

    /// Run a batch built from raw values, assigning ids on the way in.
    pub async fn run_values<T, R>(
        &self,
        values: Vec<T>,
        task_ids: Option<Vec<TaskId>>,
        executor: Arc<dyn JobExecutor<T, R>>,
        options: &BatchOptions,
    ) -> Result<BatchResult<R>>
    where
        T: Send + 'static,
        R: Send + 'static,
    {
        let jobs = make_jobs(values, task_ids)?;
        self.run(jobs, executor, options).await
    }

    /// Run a batch of pre-built jobs to completion.
    ///
    /// Resolves only when every job is terminal: the returned result holds
    /// exactly one outcome per submitted job.
    pub async fn run<T, R>(
        &self,
        jobs: Vec<Job<T>>,
        executor: Arc<dyn JobExecutor<T, R>>,
        options: &BatchOptions,
    ) -> Result<BatchResult<R>>
    where
        T: Send + 'static,
        R: Send + 'static,
    {
        let batch_id = Uuid::new_v4();
        let total = jobs.len();

        if total == 0 {
            info!(batch_id = %batch_id, "empty batch, nothing to run");
            return Ok(BatchResult::empty());
        }

        if options.mode == ExecutionMode::Process && !executor.supports_process_isolation() {
            return Err(EngineError::Scheduling(
                "process execution mode requires a process-isolating executor".to_string(),
            ));
        }

        let started = Instant::now();

        // One eager sample sizes the pool; the background loop then keeps
        // peaks and the throttle flag current for the batch summary.
        let monitor = ResourceMonitor::new(
            Arc::clone(&self.probe),
            Arc::clone(&self.time),
            self.config.monitor.clone(),
        );
        let initial_sample = monitor.tick();
        let worker_count = self.worker_count_for(initial_sample.as_ref(), &monitor, options);
        monitor.start();

        let progress = Arc::new(ProgressTracker::new(total, self.config.progress.clone()));
        if let Some(callback) = &options.on_progress {
            progress.subscribe(Arc::clone(callback));
        }
        progress.start();

        info!(
            batch_id = %batch_id,
            jobs = total,
            workers = worker_count,
            mode = %options.mode,
            preserve_order = options.preserve_order,
            "batch started"
        );

        let collected = self
            .dispatch_and_collect(jobs, executor, options, &progress, worker_count)
            .await;

        progress.stop().await;
        monitor.stop().await;
        let outcomes = collected?;

        let elapsed = started.elapsed();
        let result = BatchResult::new(outcomes);
        let resources = monitor.snapshot();
        info!(
            batch_id = %batch_id,
            total = result.len(),
            succeeded = result.succeeded_count(),
            failed = result.failed_count(),
            elapsed_secs = elapsed.as_secs_f64(),
            peak_cpu = resources.peak_cpu_percent,
            peak_memory = resources.peak_memory_percent,
            "batch complete"
        );

        if let Some(perf) = &options.perf {
            perf.record("batch_run", elapsed.as_secs_f64());
        }

        Ok(result)
    }

    /// Group items into fixed-size chunks, run one job per chunk, and
    /// flatten the successful chunk values in submission order. A failed
    /// chunk drops only its own items.
    pub async fn run_chunked<T, R>(
        &self,
        items: Vec<T>,
        chunk_size: usize,
        executor: Arc<dyn JobExecutor<Vec<T>, Vec<R>>>,
        options: &BatchOptions,
    ) -> Result<Vec<R>>
    where
        T: Send + 'static,
        R: Send + 'static,
    {
        if chunk_size == 0 {
            return Err(EngineError::Scheduling(
                "chunk size must be at least 1".to_string(),
            ));
        }
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let mut chunks: Vec<Vec<T>> = Vec::with_capacity(items.len().div_ceil(chunk_size));
        let mut current = Vec::with_capacity(chunk_size);
        for item in items {
            current.push(item);
            if current.len() == chunk_size {
                chunks.push(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() {
            chunks.push(current);
        }

        let jobs: Vec<Job<Vec<T>>> = chunks
            .into_iter()
            .enumerate()
            .map(|(i, chunk)| Job::new(format!("chunk-{i}"), i, chunk))
            .collect();

        let result = self.run(jobs, executor, options).await?;

        let mut outcomes = result.into_outcomes();
        outcomes.sort_by_key(|o| o.original_index);
        let mut flattened = Vec::new();
        for mut outcome in outcomes {
            if let Some(values) = outcome.value.take() {
                flattened.extend(values);
            }
        }
        Ok(flattened)
    }

    /// Chunked map phase followed by a caller-supplied reduce over the
    /// successfully mapped values.
    pub async fn map_reduce<T, M, R, F>(
        &self,
        items: Vec<T>,
        chunk_size: usize,
        map_executor: Arc<dyn JobExecutor<Vec<T>, Vec<M>>>,
        reduce: F,
        options: &BatchOptions,
    ) -> Result<R>
    where
        T: Send + 'static,
        M: Send + 'static,
        F: FnOnce(Vec<M>) -> R,
    {
        let mapped = self.run_chunked(items, chunk_size, map_executor, options).await?;
        Ok(reduce(mapped))
    }

    fn worker_count_for(
        &self,
        sample: Option<&crate::port::ResourceSample>,
        monitor: &ResourceMonitor,
        options: &BatchOptions,
    ) -> usize {
        let max_workers = options.max_workers.unwrap_or(self.config.max_workers);
        if !self.config.adaptive {
            return max_workers.max(1);
        }
        select_worker_count(
            sample,
            monitor.should_throttle(),
            self.config.min_workers,
            max_workers,
        )
    }

    async fn dispatch_and_collect<T, R>(
        &self,
        jobs: Vec<Job<T>>,
        executor: Arc<dyn JobExecutor<T, R>>,
        options: &BatchOptions,
        progress: &Arc<ProgressTracker>,
        worker_count: usize,
    ) -> Result<Vec<Outcome<R>>>
    where
        T: Send + 'static,
        R: Send + 'static,
    {
        let total = jobs.len();
        let semaphore = Arc::new(Semaphore::new(worker_count));
        let cancel = options.cancel.clone().unwrap_or_else(CancelToken::never);
        let mut join_set: JoinSet<Outcome<R>> = JoinSet::new();
        let mut skipped: Vec<Outcome<R>> = Vec::new();

        for mut job in jobs {
            // Cooperative cancellation: checked between dispatches only;
            // in-flight jobs always run to completion.
            if cancel.is_cancelled() {
                skipped.push(skip_job(job, progress)?);
                continue;
            }

            let mut cancel_wait = cancel.clone();
            let permit = tokio::select! {
                permit = Arc::clone(&semaphore).acquire_owned() => {
                    permit.map_err(|_| {
                        EngineError::Internal("worker semaphore closed".to_string())
                    })?
                }
                _ = cancel_wait.wait() => {
                    skipped.push(skip_job(job, progress)?);
                    continue;
                }
            };

            job.dispatch()?;
            let runner = JobRunner {
                executor: Arc::clone(&executor),
                probe: Arc::clone(&self.probe),
                time: Arc::clone(&self.time),
                progress: Arc::clone(progress),
                tracker: options.tracker.clone(),
                timeout: options.timeout,
            };
            join_set.spawn(async move {
                let _permit = permit;
                runner.execute(job).await
            });
        }

        let mut completed: Vec<Outcome<R>> = Vec::with_capacity(total);
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(outcome) => completed.push(outcome),
                Err(e) => {
                    return Err(EngineError::Internal(format!("worker task failed: {e}")));
                }
            }
        }

        if options.preserve_order {
            place_by_index(completed, skipped, total)
        } else {
            completed.extend(skipped);
            Ok(completed)
        }
    }
}

/// Place outcomes at their submission index, enforcing the one-outcome-
/// per-job invariant structurally.
fn place_by_index<R>(
    completed: Vec<Outcome<R>>,
    skipped: Vec<Outcome<R>>,
    total: usize,
) -> Result<Vec<Outcome<R>>> {
    let mut slots: Vec<Option<Outcome<R>>> = Vec::with_capacity(total);
    slots.resize_with(total, || None);

    for outcome in completed.into_iter().chain(skipped) {
        let index = outcome.original_index;
        if index >= total || slots[index].is_some() {
            return Err(EngineError::Internal(format!(
                "duplicate or out-of-range outcome index {index}"
            )));
        }
        slots[index] = Some(outcome);
    }

    let mut ordered = Vec::with_capacity(total);
    for slot in slots {
        match slot {
            Some(outcome) => ordered.push(outcome),
            None => {
                return Err(EngineError::Internal(
                    "job finished without an outcome".to_string(),
                ));
            }
        }
    }
    Ok(ordered)
}

fn skip_job<T, R>(mut job: Job<T>, progress: &ProgressTracker) -> Result<Outcome<R>> {
    job.skip()?;
    progress.item_skipped();
    debug!(job_id = %job.id, "job skipped, cancellation requested");
    Ok(Outcome::skipped(job.id, job.index))
}

/// Everything one dispatched job needs to run and report.
struct JobRunner<T, R> {
    executor: Arc<dyn JobExecutor<T, R>>,
    probe: Arc<dyn ResourceProbe>,
    time: Arc<dyn TimeProvider>,
    progress: Arc<ProgressTracker>,
    tracker: Option<WorkerTracker>,
    timeout: Option<Duration>,
}

impl<T, R> JobRunner<T, R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    async fn execute(self, job: Job<T>) -> Outcome<R> {
        let JobRunner {
            executor,
            probe,
            time,
            progress,
            tracker,
            timeout,
        } = self;

        let task_id = job.id.clone();
        let index = job.index;
        let dispatched_ms = time.now_millis();
        progress.item_started();

        let worker_time = Arc::clone(&time);
        let handle = tokio::task::spawn_blocking(move || {
            run_on_worker(job, executor, probe, worker_time, tracker)
        });

        let joined = match timeout {
            Some(limit) => match tokio::time::timeout(limit, handle).await {
                Ok(joined) => joined,
                Err(_elapsed) => {
                    // The orphaned executor keeps running unobserved; only
                    // its worker slot is reclaimed.
                    warn!(
                        job_id = %task_id,
                        timeout_secs = limit.as_secs_f64(),
                        "job deadline elapsed, reclaiming worker slot"
                    );
                    progress.item_completed(false);
                    return Outcome::failed(
                        task_id,
                        index,
                        ErrorInfo::timeout(format!(
                            "job exceeded timeout of {:.1}s",
                            limit.as_secs_f64()
                        )),
                        ExecutionStamp {
                            started_at_ms: dispatched_ms,
                            finished_at_ms: time.now_millis(),
                            duration: limit,
                            worker_id: None,
                            memory_delta_mb: None,
                        },
                    );
                }
            },
            None => handle.await,
        };

        let outcome = match joined {
            Ok((Ok(value), stamp)) => {
                debug!(
                    job_id = %task_id,
                    duration_ms = stamp.duration.as_millis() as u64,
                    "job succeeded"
                );
                Outcome::succeeded(task_id, index, value, stamp)
            }
            Ok((Err(exec_err), stamp)) => {
                error!(job_id = %task_id, error = %exec_err, "job failed");
                Outcome::failed(
                    task_id,
                    index,
                    ErrorInfo::executor(exec_err.to_string()),
                    stamp,
                )
            }
            Err(join_err) => {
                let message = panic_message(join_err);
                error!(job_id = %task_id, panic = %message, "job panicked");
                let finished_ms = time.now_millis();
                Outcome::failed(
                    task_id,
                    index,
                    ErrorInfo::panic(message),
                    ExecutionStamp {
                        started_at_ms: dispatched_ms,
                        finished_at_ms: finished_ms,
                        duration: Duration::from_millis(
                            (finished_ms - dispatched_ms).max(0) as u64,
                        ),
                        worker_id: None,
                        memory_delta_mb: None,
                    },
                )
            }
        };

        progress.item_completed(outcome.success());
        outcome
    }
}

/// Blocking-side wrapper: state transitions, timing, worker identity and
/// memory bookkeeping around one executor call.
fn run_on_worker<T, R>(
    mut job: Job<T>,
    executor: Arc<dyn JobExecutor<T, R>>,
    probe: Arc<dyn ResourceProbe>,
    time: Arc<dyn TimeProvider>,
    tracker: Option<WorkerTracker>,
) -> (std::result::Result<R, ExecError>, ExecutionStamp) {
    let worker_id = tracker::worker_ident();
    if let Some(t) = &tracker {
        t.job_assigned(&job.id, &worker_id);
    }
    let _release = ReleaseOnDrop(tracker);

    let memory_before = probe.process_memory_mb();
    let started_ms = time.now_millis();
    let timer = Instant::now();

    let exec_result = match job.start() {
        Ok(()) => executor.execute(&job.input),
        Err(e) => Err(ExecError::Failed(format!("job state error: {e}"))),
    };

    let duration = timer.elapsed();
    let finished_ms = time.now_millis();
    let memory_delta_mb = match (memory_before, probe.process_memory_mb()) {
        (Some(before), Some(after)) => Some(after - before),
        _ => None,
    };

    let stamp = ExecutionStamp {
        started_at_ms: started_ms,
        finished_at_ms: finished_ms,
        duration,
        worker_id: Some(worker_id),
        memory_delta_mb,
    };
    (exec_result, stamp)
}

/// Decrements the tracker's active count even when the executor panics.
struct ReleaseOnDrop(Option<WorkerTracker>);

impl Drop for ReleaseOnDrop {
    fn drop(&mut self) {
        if let Some(tracker) = &self.0 {
            tracker.job_released();
        }
    }
}

fn panic_message(err: tokio::task::JoinError) -> String {
    if err.is_panic() {
        let payload = err.into_panic();
        if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic".to_string()
        }
    } else {
        "worker task cancelled".to_string()
    }
}
