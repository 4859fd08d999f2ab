//! Directory orchestrator - plans per-file conversion jobs over a source
//! tree and runs them sequentially or through the task scheduler
//!
//! Per-file problems (unreadable path, output collision, executor failure)
//! become failed `FileOutcome`s; only broken roots or a failed walk abort
//! the whole call.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::application::perf::PerfMonitor;
use crate::application::scheduler::{BatchOptions, CancelToken, TaskScheduler};
use crate::domain::{FileOutcome, Job, Outcome};
use crate::error::{EngineError, Result};
use crate::port::{FileClassifier, FileWalker, JobExecutor, SecurityValidator};

/// How candidate files are driven through the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingMode {
    /// One file at a time on the blocking pool, no worker pool or monitor
    Sequential,
    /// Batched through the task scheduler
    Parallel,
}

impl Default for ProcessingMode {
    fn default() -> Self {
        Self::Parallel
    }
}

impl std::fmt::Display for ProcessingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sequential => write!(f, "SEQUENTIAL"),
            Self::Parallel => write!(f, "PARALLEL"),
        }
    }
}

/// Orchestrator configuration
#[derive(Clone)]
pub struct OrchestratorConfig {
    /// Persist the performance report under the output root after a run
    pub save_performance_report: bool,
    pub report_file_name: String,
    /// Extension given to every planned output file
    pub output_extension: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            save_performance_report: false,
            report_file_name: "performance_report.json".to_string(),
            output_extension: "md".to_string(),
        }
    }
}

/// Per-call options for one directory run
#[derive(Clone)]
pub struct DirectoryOptions {
    pub recursive: bool,
    /// Extension allowlist for this call; None defers to the classifier
    pub extensions: Option<Vec<String>>,
    pub mode: ProcessingMode,
    /// Pool bound for this call only
    pub max_workers: Option<usize>,
    pub timeout: Option<std::time::Duration>,
    pub cancel: Option<CancelToken>,
}

impl Default for DirectoryOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            extensions: None,
            mode: ProcessingMode::default(),
            max_workers: None,
            timeout: None,
            cancel: None,
        }
    }
}

/// A candidate file with its resolved output path.
#[derive(Debug, Clone)]
pub struct PlannedFile {
    pub input: PathBuf,
    pub output: PathBuf,
}

/// Walks a source tree, maps each admitted file to an output path and runs
/// the injected executor over the batch.
pub struct DirectoryOrchestrator {
    scheduler: TaskScheduler,
    executor: Arc<dyn JobExecutor<PlannedFile, PathBuf>>,
    validator: Arc<dyn SecurityValidator>,
    classifier: Arc<dyn FileClassifier>,
    walker: Arc<dyn FileWalker>,
    perf: Arc<PerfMonitor>,
    config: OrchestratorConfig,
}

impl DirectoryOrchestrator {
    pub fn new(
        scheduler: TaskScheduler,
        executor: Arc<dyn JobExecutor<PlannedFile, PathBuf>>,
        validator: Arc<dyn SecurityValidator>,
        classifier: Arc<dyn FileClassifier>,
        walker: Arc<dyn FileWalker>,
        perf: Arc<PerfMonitor>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            scheduler,
            executor,
            validator,
            classifier,
            walker,
            perf,
            config,
        }
    }

    /// Convert every admitted file under `input_root` into `output_root`,
    /// mirroring the directory structure.
    ///
    /// Returns one `FileOutcome` per candidate file. Sequential and
    /// parallel modes produce the same success/failure set for the same
    /// tree.
    ///
    /// # Errors
    ///
    /// Fails only when the walk itself fails or the scheduler cannot run
    /// the batch; per-file problems are reported in the outcome list.
    pub async fn process(
        &self,
        input_root: &Path,
        output_root: &Path,
        options: &DirectoryOptions,
    ) -> Result<Vec<FileOutcome>> {
        let started = Instant::now();

        if let Err(e) = self.validator.validate_input(input_root) {
            warn!(path = %input_root.display(), error = %e, "input root rejected");
            return Ok(vec![FileOutcome::failed(
                input_root.to_path_buf(),
                format!("Input directory validation failed: {e}"),
            )]);
        }
        if let Err(e) = self.validator.validate_output(output_root) {
            warn!(path = %output_root.display(), error = %e, "output root rejected");
            return Ok(vec![FileOutcome::failed(
                input_root.to_path_buf(),
                format!("Output directory validation failed: {e}"),
            )]);
        }

        let filter: Option<Vec<String>> = options.extensions.as_ref().map(|exts| {
            exts.iter()
                .map(|e| crate::port::file_classifier::normalize_extension(e))
                .collect()
        });

        let walked = self
            .walker
            .walk(input_root, options.recursive)
            .map_err(|e| {
                EngineError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    e.to_string(),
                ))
            })?;

        let candidates: Vec<PathBuf> = walked
            .into_iter()
            .filter(|path| self.classifier.should_process(path, filter.as_deref()))
            .collect();

        if candidates.is_empty() {
            info!(
                input = %input_root.display(),
                recursive = options.recursive,
                "no matching files found"
            );
            return Ok(Vec::new());
        }

        info!(
            input = %input_root.display(),
            output = %output_root.display(),
            files = candidates.len(),
            mode = %options.mode,
            "directory batch started"
        );

        // Plan every candidate up front so output collisions and broken
        // paths fail before anything is dispatched.
        let total = candidates.len();
        let mut results: Vec<Option<FileOutcome>> = Vec::with_capacity(total);
        results.resize_with(total, || None);
        let mut ready: Vec<(usize, PlannedFile)> = Vec::new();
        let mut seen_outputs: HashMap<PathBuf, PathBuf> = HashMap::new();

        for (idx, input) in candidates.iter().enumerate() {
            match self.plan_file(input, input_root, output_root) {
                Ok(planned) => {
                    if let Some(first) = seen_outputs.get(&planned.output) {
                        results[idx] = Some(FileOutcome::failed(
                            input.clone(),
                            format!(
                                "Output path {} collides with {}",
                                planned.output.display(),
                                first.display()
                            ),
                        ));
                        continue;
                    }
                    seen_outputs.insert(planned.output.clone(), input.clone());
                    ready.push((idx, planned));
                }
                Err(reason) => {
                    results[idx] = Some(FileOutcome::failed(input.clone(), reason));
                }
            }
        }

        let processed = match options.mode {
            ProcessingMode::Sequential => self.run_sequential(ready, options).await?,
            ProcessingMode::Parallel => self.run_parallel(ready, options).await?,
        };
        for (idx, outcome) in processed {
            results[idx] = Some(outcome);
        }

        let mut outcomes = Vec::with_capacity(total);
        for slot in results {
            match slot {
                Some(outcome) => outcomes.push(outcome),
                None => {
                    return Err(EngineError::Internal(
                        "candidate file finished without an outcome".to_string(),
                    ));
                }
            }
        }

        let succeeded = outcomes.iter().filter(|o| o.success).count();
        info!(
            files = outcomes.len(),
            succeeded,
            failed = outcomes.len() - succeeded,
            elapsed_secs = started.elapsed().as_secs_f64(),
            "directory batch complete"
        );

        self.perf
            .record("process_directory", started.elapsed().as_secs_f64());
        if self.config.save_performance_report {
            self.save_report(output_root);
        }

        Ok(outcomes)
    }

    /// Resolve the output path for one input and create its parent
    /// directory. Errors are per-file reasons, not engine failures.
    fn plan_file(
        &self,
        input: &Path,
        input_root: &Path,
        output_root: &Path,
    ) -> std::result::Result<PlannedFile, String> {
        if !input.is_file() {
            return Err("Path is not a file".to_string());
        }

        let stem = input
            .file_stem()
            .ok_or_else(|| "File has no name".to_string())?;

        let relative_parent = input
            .strip_prefix(input_root)
            .map_err(|_| format!("Path is outside the input root: {}", input.display()))?
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let out_dir = output_root.join(relative_parent);
        std::fs::create_dir_all(&out_dir)
            .map_err(|e| format!("Cannot create output directory: {e}"))?;

        // Extension is appended; a dotted stem like notes.tar maps to
        // notes.tar.md
        let output = out_dir.join(format!(
            "{}.{}",
            stem.to_string_lossy(),
            self.config.output_extension
        ));
        Ok(PlannedFile {
            input: input.to_path_buf(),
            output,
        })
    }

    async fn run_parallel(
        &self,
        ready: Vec<(usize, PlannedFile)>,
        options: &DirectoryOptions,
    ) -> Result<Vec<(usize, FileOutcome)>> {
        if ready.is_empty() {
            return Ok(Vec::new());
        }

        let candidate_of: Vec<usize> = ready.iter().map(|(idx, _)| *idx).collect();
        let planned_of: Vec<PlannedFile> = ready.iter().map(|(_, p)| p.clone()).collect();

        let jobs: Vec<Job<PlannedFile>> = ready
            .into_iter()
            .enumerate()
            .map(|(job_idx, (_, planned))| {
                let name = planned
                    .input
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "unnamed".to_string());
                Job::new(format!("file-{job_idx}-{name}"), job_idx, planned)
            })
            .collect();

        let batch_options = BatchOptions {
            timeout: options.timeout,
            max_workers: options.max_workers,
            cancel: options.cancel.clone(),
            perf: Some(Arc::clone(&self.perf)),
            ..BatchOptions::default()
        };

        let result = self
            .scheduler
            .run(jobs, Arc::clone(&self.executor), &batch_options)
            .await?;

        let mut merged = Vec::with_capacity(result.len());
        for outcome in result.into_outcomes() {
            let job_idx = outcome.original_index;
            let planned = &planned_of[job_idx];
            if !outcome.stamp.duration.is_zero() {
                self.perf
                    .record("process_file", outcome.stamp.duration.as_secs_f64());
            }
            merged.push((candidate_of[job_idx], file_outcome_of(outcome, planned)));
        }
        Ok(merged)
    }

    async fn run_sequential(
        &self,
        ready: Vec<(usize, PlannedFile)>,
        options: &DirectoryOptions,
    ) -> Result<Vec<(usize, FileOutcome)>> {
        if ready.is_empty() {
            return Ok(Vec::new());
        }

        let executor = Arc::clone(&self.executor);
        let perf = Arc::clone(&self.perf);
        let cancel = options.cancel.clone().unwrap_or_else(CancelToken::never);
        let total = ready.len();

        let handle = tokio::task::spawn_blocking(move || {
            let mut outcomes = Vec::with_capacity(total);
            for (position, (idx, planned)) in ready.into_iter().enumerate() {
                if cancel.is_cancelled() {
                    debug!(path = %planned.input.display(), "file skipped, cancellation requested");
                    outcomes.push((
                        idx,
                        FileOutcome::failed(planned.input, "cancelled before start"),
                    ));
                    continue;
                }

                info!(
                    file = position + 1,
                    total,
                    path = %planned.input.display(),
                    "processing file"
                );
                let timer = Instant::now();
                let executed =
                    catch_unwind(AssertUnwindSafe(|| executor.execute(&planned)));
                let duration = timer.elapsed();
                perf.record("process_file", duration.as_secs_f64());

                let outcome = match executed {
                    Ok(Ok(written)) => {
                        FileOutcome::succeeded(planned.input, written, duration)
                    }
                    Ok(Err(e)) => FileOutcome::failed_after(
                        planned.input,
                        Some(planned.output),
                        e.to_string(),
                        duration,
                    ),
                    Err(payload) => {
                        let message = if let Some(s) = payload.downcast_ref::<&str>() {
                            (*s).to_string()
                        } else if let Some(s) = payload.downcast_ref::<String>() {
                            s.clone()
                        } else {
                            "unknown panic".to_string()
                        };
                        FileOutcome::failed_after(
                            planned.input,
                            Some(planned.output),
                            format!("executor panicked: {message}"),
                            duration,
                        )
                    }
                };
                outcomes.push((idx, outcome));
            }
            outcomes
        });

        handle
            .await
            .map_err(|e| EngineError::Internal(format!("sequential worker failed: {e}")))
    }

    fn save_report(&self, output_root: &Path) {
        let path = output_root.join(&self.config.report_file_name);
        if let Err(e) = self.perf.save(&path) {
            warn!(path = %path.display(), error = %e, "could not save performance report");
        }
    }
}

fn file_outcome_of(outcome: Outcome<PathBuf>, planned: &PlannedFile) -> FileOutcome {
    let duration = outcome.stamp.duration;
    match outcome.value {
        Some(written) => FileOutcome::succeeded(planned.input.clone(), written, duration),
        None => {
            let message = outcome
                .error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown error".to_string());
            FileOutcome::failed_after(
                planned.input.clone(),
                Some(planned.output.clone()),
                message,
                duration,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::monitor::MonitorConfig;
    use crate::application::scheduler::{cancel_channel, SchedulerConfig};
    use crate::port::file_classifier::mocks::AcceptAllClassifier;
    use crate::port::file_walker::mocks::StaticWalker;
    use crate::port::job_executor::mocks::FnJobExecutor;
    use crate::port::resource_probe::mocks::MockResourceProbe;
    use crate::port::security_validator::mocks::{AllowAllValidator, RejectingValidator};
    use crate::port::{ExecError, SystemTimeProvider, TimeProvider};
    use std::fs;
    use tempfile::tempdir;

    fn copying_executor() -> Arc<dyn JobExecutor<PlannedFile, PathBuf>> {
        Arc::new(FnJobExecutor::new(|planned: &PlannedFile| {
            let body = fs::read_to_string(&planned.input).map_err(|e| ExecError::Io(e.to_string()))?;
            fs::write(&planned.output, body.to_uppercase())
                .map_err(|e| ExecError::Io(e.to_string()))?;
            Ok(planned.output.clone())
        }))
    }

    fn orchestrator_with(
        walker: Arc<dyn FileWalker>,
        executor: Arc<dyn JobExecutor<PlannedFile, PathBuf>>,
        validator: Arc<dyn SecurityValidator>,
        perf: Arc<PerfMonitor>,
        config: OrchestratorConfig,
    ) -> DirectoryOrchestrator {
        let time: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
        let scheduler = TaskScheduler::new(
            Arc::new(MockResourceProbe::new(10.0, 10.0)),
            Arc::clone(&time),
            SchedulerConfig {
                min_workers: 2,
                max_workers: 4,
                monitor: MonitorConfig::default(),
                ..SchedulerConfig::default()
            },
        );
        DirectoryOrchestrator::new(
            scheduler,
            executor,
            validator,
            Arc::new(AcceptAllClassifier),
            walker,
            perf,
            config,
        )
    }

    fn seed_tree(root: &Path) -> Vec<PathBuf> {
        fs::create_dir_all(root.join("sub")).unwrap();
        let files = vec![
            root.join("a.txt"),
            root.join("b.txt"),
            root.join("sub").join("c.txt"),
        ];
        for (i, file) in files.iter().enumerate() {
            fs::write(file, format!("doc {i}")).unwrap();
        }
        files
    }

    fn disabled_perf() -> Arc<PerfMonitor> {
        Arc::new(PerfMonitor::new(false, Arc::new(SystemTimeProvider)))
    }

    #[tokio::test]
    async fn converts_a_tree_and_mirrors_structure() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        let files = seed_tree(input.path());

        let orchestrator = orchestrator_with(
            Arc::new(StaticWalker::new(files.clone())),
            copying_executor(),
            Arc::new(AllowAllValidator),
            disabled_perf(),
            OrchestratorConfig::default(),
        );

        let outcomes = orchestrator
            .process(input.path(), output.path(), &DirectoryOptions::default())
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes.iter().all(|o| o.success));
        assert_eq!(outcomes[0].input_path, files[0]);

        let mirrored = output.path().join("sub").join("c.md");
        assert_eq!(fs::read_to_string(&mirrored).unwrap(), "DOC 2");
        assert_eq!(
            outcomes[2].output_path.as_deref(),
            Some(mirrored.as_path())
        );
    }

    #[tokio::test]
    async fn rejected_input_root_yields_a_single_failed_outcome() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        seed_tree(input.path());

        let orchestrator = orchestrator_with(
            Arc::new(StaticWalker::new(vec![input.path().join("a.txt")])),
            copying_executor(),
            Arc::new(RejectingValidator::inputs("path denied")),
            disabled_perf(),
            OrchestratorConfig::default(),
        );

        let outcomes = orchestrator
            .process(input.path(), output.path(), &DirectoryOptions::default())
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 1);
        assert!(!outcomes[0].success);
        assert!(outcomes[0]
            .error
            .as_deref()
            .unwrap()
            .contains("path denied"));
    }

    #[tokio::test]
    async fn colliding_outputs_fail_the_later_file() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        let first = input.path().join("a.txt");
        let second = input.path().join("a.TXT");
        fs::write(&first, "one").unwrap();
        fs::write(&second, "two").unwrap();

        let orchestrator = orchestrator_with(
            Arc::new(StaticWalker::new(vec![first.clone(), second.clone()])),
            copying_executor(),
            Arc::new(AllowAllValidator),
            disabled_perf(),
            OrchestratorConfig::default(),
        );

        let outcomes = orchestrator
            .process(input.path(), output.path(), &DirectoryOptions::default())
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].success);
        assert!(!outcomes[1].success);
        assert!(outcomes[1].error.as_deref().unwrap().contains("collides"));
        assert_eq!(fs::read_to_string(output.path().join("a.md")).unwrap(), "ONE");
    }

    #[tokio::test]
    async fn dotted_stems_keep_their_inner_dots() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        let plain = input.path().join("notes.gz");
        let dotted = input.path().join("notes.tar.gz");
        fs::write(&plain, "plain").unwrap();
        fs::write(&dotted, "dotted").unwrap();

        let orchestrator = orchestrator_with(
            Arc::new(StaticWalker::new(vec![plain, dotted])),
            copying_executor(),
            Arc::new(AllowAllValidator),
            disabled_perf(),
            OrchestratorConfig::default(),
        );

        let outcomes = orchestrator
            .process(input.path(), output.path(), &DirectoryOptions::default())
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.success), "{outcomes:?}");
        assert_eq!(
            fs::read_to_string(output.path().join("notes.md")).unwrap(),
            "PLAIN"
        );
        assert_eq!(
            fs::read_to_string(output.path().join("notes.tar.md")).unwrap(),
            "DOTTED"
        );
    }

    #[tokio::test]
    async fn candidates_outside_the_input_root_fail_their_own_outcome() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        let elsewhere = tempdir().unwrap();
        let stray = elsewhere.path().join("outside.txt");
        fs::write(&stray, "outside").unwrap();

        let orchestrator = orchestrator_with(
            Arc::new(StaticWalker::new(vec![stray.clone()])),
            copying_executor(),
            Arc::new(AllowAllValidator),
            disabled_perf(),
            OrchestratorConfig::default(),
        );

        let outcomes = orchestrator
            .process(input.path(), output.path(), &DirectoryOptions::default())
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 1);
        assert!(!outcomes[0].success);
        assert_eq!(outcomes[0].input_path, stray);
        assert!(outcomes[0]
            .error
            .as_deref()
            .unwrap()
            .contains("outside the input root"));
        assert_eq!(
            fs::read_dir(output.path()).unwrap().count(),
            0,
            "nothing may be planned into the output root"
        );
    }

    #[tokio::test]
    async fn non_file_candidates_fail_without_stopping_the_batch() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        let file = input.path().join("a.txt");
        fs::write(&file, "one").unwrap();
        let directory = input.path().join("not-a-file.txt");
        fs::create_dir_all(&directory).unwrap();

        let orchestrator = orchestrator_with(
            Arc::new(StaticWalker::new(vec![file, directory.clone()])),
            copying_executor(),
            Arc::new(AllowAllValidator),
            disabled_perf(),
            OrchestratorConfig::default(),
        );

        let outcomes = orchestrator
            .process(input.path(), output.path(), &DirectoryOptions::default())
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].success);
        assert!(!outcomes[1].success);
        assert_eq!(outcomes[1].error.as_deref(), Some("Path is not a file"));
        assert_eq!(outcomes[1].input_path, directory);
    }

    #[tokio::test]
    async fn empty_walk_returns_no_outcomes() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();

        let orchestrator = orchestrator_with(
            Arc::new(StaticWalker::new(Vec::new())),
            copying_executor(),
            Arc::new(AllowAllValidator),
            disabled_perf(),
            OrchestratorConfig::default(),
        );

        let outcomes = orchestrator
            .process(input.path(), output.path(), &DirectoryOptions::default())
            .await
            .unwrap();
        assert!(outcomes.is_empty());
    }

    #[tokio::test]
    async fn sequential_and_parallel_runs_agree() {
        let input = tempdir().unwrap();
        let out_seq = tempdir().unwrap();
        let out_par = tempdir().unwrap();
        let files = seed_tree(input.path());

        let failing_name = files[1].clone();
        let executor: Arc<dyn JobExecutor<PlannedFile, PathBuf>> =
            Arc::new(FnJobExecutor::new(move |planned: &PlannedFile| {
                if planned.input == failing_name {
                    return Err(ExecError::Failed("unsupported layout".to_string()));
                }
                let body =
                    fs::read_to_string(&planned.input).map_err(|e| ExecError::Io(e.to_string()))?;
                fs::write(&planned.output, body.to_uppercase())
                    .map_err(|e| ExecError::Io(e.to_string()))?;
                Ok(planned.output.clone())
            }));

        let orchestrator = orchestrator_with(
            Arc::new(StaticWalker::new(files.clone())),
            executor,
            Arc::new(AllowAllValidator),
            disabled_perf(),
            OrchestratorConfig::default(),
        );

        let sequential = orchestrator
            .process(
                input.path(),
                out_seq.path(),
                &DirectoryOptions {
                    mode: ProcessingMode::Sequential,
                    ..DirectoryOptions::default()
                },
            )
            .await
            .unwrap();
        let parallel = orchestrator
            .process(input.path(), out_par.path(), &DirectoryOptions::default())
            .await
            .unwrap();

        assert_eq!(sequential.len(), parallel.len());
        for (s, p) in sequential.iter().zip(parallel.iter()) {
            assert_eq!(s.input_path, p.input_path);
            assert_eq!(s.success, p.success);
        }
        assert_eq!(
            fs::read_to_string(out_seq.path().join("a.md")).unwrap(),
            fs::read_to_string(out_par.path().join("a.md")).unwrap()
        );
    }

    #[tokio::test]
    async fn cancelled_sequential_run_fails_remaining_files() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        let files = seed_tree(input.path());

        let (handle, token) = cancel_channel();
        handle.cancel();

        let orchestrator = orchestrator_with(
            Arc::new(StaticWalker::new(files)),
            copying_executor(),
            Arc::new(AllowAllValidator),
            disabled_perf(),
            OrchestratorConfig::default(),
        );

        let outcomes = orchestrator
            .process(
                input.path(),
                output.path(),
                &DirectoryOptions {
                    mode: ProcessingMode::Sequential,
                    cancel: Some(token),
                    ..DirectoryOptions::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 3);
        for outcome in &outcomes {
            assert!(!outcome.success);
            assert!(outcome.error.as_deref().unwrap().contains("cancelled"));
        }
    }

    #[tokio::test]
    async fn performance_report_is_written_when_enabled() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        let files = seed_tree(input.path());

        let perf = Arc::new(PerfMonitor::new(true, Arc::new(SystemTimeProvider)));
        let orchestrator = orchestrator_with(
            Arc::new(StaticWalker::new(files)),
            copying_executor(),
            Arc::new(AllowAllValidator),
            Arc::clone(&perf),
            OrchestratorConfig {
                save_performance_report: true,
                ..OrchestratorConfig::default()
            },
        );

        orchestrator
            .process(input.path(), output.path(), &DirectoryOptions::default())
            .await
            .unwrap();

        let report_path = output.path().join("performance_report.json");
        let raw = fs::read_to_string(&report_path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed["enabled"], serde_json::json!(true));
        let names: Vec<&str> = parsed["operations"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|op| op["name"].as_str())
            .collect();
        assert!(names.contains(&"process_file"));
        assert!(names.contains(&"batch_run"));
    }
}
