//! Subprocess Batch Tests
//!
//! Process execution mode end to end: real child processes driven through
//! the scheduler, with failures, timeouts and environment isolation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use docbatch_core::application::{BatchOptions, SchedulerConfig, TaskScheduler};
use docbatch_core::domain::{ErrorKind, ExecutionMode, JobState};
use docbatch_core::port::SystemTimeProvider;
use docbatch_infra_system::{CommandSpec, SubprocessExecutor, SysinfoProbe};

fn scheduler() -> TaskScheduler {
    TaskScheduler::new(
        Arc::new(SysinfoProbe::new()),
        Arc::new(SystemTimeProvider),
        SchedulerConfig {
            min_workers: 2,
            max_workers: 4,
            ..SchedulerConfig::default()
        },
    )
}

fn process_options() -> BatchOptions {
    BatchOptions {
        mode: ExecutionMode::Process,
        ..BatchOptions::default()
    }
}

/// Every child runs in its own process; stdout comes back per job.
#[tokio::test(flavor = "multi_thread")]
async fn child_stdout_is_captured_per_job() {
    let executor = Arc::new(SubprocessExecutor::new(vec!["PATH".to_string()]));
    let specs: Vec<CommandSpec> = (0..6)
        .map(|i| CommandSpec::new("echo").arg(format!("doc-{i}")))
        .collect();

    let result = scheduler()
        .run_values(specs, None, executor, &process_options())
        .await
        .expect("batch should run");

    assert_eq!(result.succeeded_count(), 6);
    for (i, outcome) in result.iter().enumerate() {
        let output = outcome.value.as_ref().expect("stdout captured");
        assert_eq!(output.stdout.trim(), format!("doc-{i}"));
    }

    println!("✅ Subprocess batch: 6 children, stdout per job");
}

/// A non-zero exit becomes a failed outcome carrying the exit code and
/// stderr; sibling jobs are untouched.
#[tokio::test(flavor = "multi_thread")]
async fn non_zero_exit_is_an_isolated_failure() {
    let executor = Arc::new(SubprocessExecutor::new(vec!["PATH".to_string()]));
    let specs = vec![
        CommandSpec::new("echo").arg("ok-one"),
        CommandSpec::new("sh").arg("-c").arg("echo corrupt >&2; exit 2"),
        CommandSpec::new("echo").arg("ok-two"),
    ];

    let result = scheduler()
        .run_values(specs, None, executor, &process_options())
        .await
        .expect("batch should run");

    assert_eq!(result.len(), 3);
    assert_eq!(result.succeeded_count(), 2);

    let failed = &result.outcomes()[1];
    assert_eq!(failed.state, JobState::Failed);
    let error = failed.error.as_ref().expect("error recorded");
    assert_eq!(error.kind, ErrorKind::Executor);
    assert!(error.message.contains("exit code 2"), "got: {}", error.message);
    assert!(error.message.contains("corrupt"), "got: {}", error.message);
}

/// A hanging child hits the per-job deadline: the slot is reclaimed, the
/// batch finishes on the scheduler's clock, not the child's.
#[tokio::test(flavor = "multi_thread")]
async fn hanging_child_times_out_without_stalling_the_batch() {
    let executor = Arc::new(SubprocessExecutor::new(vec!["PATH".to_string()]));
    let specs = vec![
        CommandSpec::new("sleep").arg("2"),
        CommandSpec::new("echo").arg("fast"),
        CommandSpec::new("echo").arg("faster"),
    ];

    let options = BatchOptions {
        timeout: Some(Duration::from_millis(200)),
        ..process_options()
    };

    let started = Instant::now();
    let result = scheduler()
        .run_values(specs, None, executor, &options)
        .await
        .expect("batch should run");
    let elapsed = started.elapsed();

    assert_eq!(result.len(), 3);
    let timed_out = &result.outcomes()[0];
    assert_eq!(timed_out.state, JobState::TimedOut);
    assert_eq!(
        timed_out.error.as_ref().map(|e| e.kind),
        Some(ErrorKind::Timeout)
    );
    assert_eq!(result.succeeded_count(), 2);
    assert!(
        elapsed < Duration::from_secs(1),
        "batch waited on the orphan: {elapsed:?}"
    );
}

/// Environment isolation holds through the whole stack: a variable not on
/// the allowlist never reaches the child.
#[tokio::test(flavor = "multi_thread")]
async fn environment_allowlist_holds_through_the_scheduler() {
    std::env::set_var("DOCBATCH_E2E_SECRET", "do-not-leak");

    let executor = Arc::new(SubprocessExecutor::new(vec!["PATH".to_string()]));
    let spec = CommandSpec::new("sh")
        .arg("-c")
        .arg("echo \"${DOCBATCH_E2E_SECRET:-clean}\"");

    let result = scheduler()
        .run_values(vec![spec], None, executor, &process_options())
        .await
        .expect("batch should run");

    let output = result.outcomes()[0].value.as_ref().expect("stdout captured");
    assert_eq!(output.stdout.trim(), "clean", "secret leaked into the child");
}

/// Threaded mode refuses the process flag only when the executor cannot
/// isolate; the subprocess executor passes the capability check.
#[tokio::test(flavor = "multi_thread")]
async fn subprocess_executor_satisfies_the_process_mode_check() {
    let executor = Arc::new(SubprocessExecutor::new(vec!["PATH".to_string()]));
    let result = scheduler()
        .run_values(
            vec![CommandSpec::new("echo").arg("capable")],
            None,
            executor,
            &process_options(),
        )
        .await;
    assert!(result.is_ok());
}
