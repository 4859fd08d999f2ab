// Progress counters and background reporter

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::application::scheduler::constants::DEFAULT_PROGRESS_INTERVAL;

/// Progress reporter configuration
#[derive(Debug, Clone)]
pub struct ProgressConfig {
    pub report_interval: Duration,
    pub stop_timeout: Duration,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            report_interval: DEFAULT_PROGRESS_INTERVAL,
            stop_timeout: Duration::from_secs(1),
        }
    }
}

/// Derived progress view, recomputed on demand from the counters.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressSnapshot {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub in_progress: usize,
    pub percent_complete: f64,
    pub elapsed_seconds: f64,
    pub items_per_second: f64,
    pub eta_seconds: f64,
    pub success_rate: f64,
}

impl ProgressSnapshot {
    /// Humanized ETA: seconds under a minute, minutes under an hour,
    /// hours beyond.
    pub fn eta_display(&self) -> String {
        if self.eta_seconds < 60.0 {
            format!("{:.1} seconds", self.eta_seconds)
        } else if self.eta_seconds < 3600.0 {
            format!("{:.1} minutes", self.eta_seconds / 60.0)
        } else {
            format!("{:.1} hours", self.eta_seconds / 3600.0)
        }
    }
}

impl std::fmt::Display for ProgressSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Progress: {:.1}% ({} completed, {} failed, {} in progress) - ETA: {}",
            self.percent_complete,
            self.completed,
            self.failed,
            self.in_progress,
            self.eta_display()
        )
    }
}

/// Observer invoked by the reporter with fresh snapshots
pub type ProgressCallback = Arc<dyn Fn(&ProgressSnapshot) + Send + Sync>;

#[derive(Default)]
struct Counters {
    completed: usize,
    failed: usize,
    in_progress: usize,
}

struct Runner {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Thread-safe batch progress state.
///
/// Counters mutate under one short-held lock, arithmetic only. Reporting
/// runs on its own timer and only reads snapshots, so a slow subscriber
/// never blocks the workers.
pub struct ProgressTracker {
    total: usize,
    started_at: Instant,
    counters: Mutex<Counters>,
    callbacks: Mutex<Vec<ProgressCallback>>,
    config: ProgressConfig,
    runner: Mutex<Option<Runner>>,
}

impl ProgressTracker {
    pub fn new(total: usize, config: ProgressConfig) -> Self {
        Self {
            total,
            started_at: Instant::now(),
            counters: Mutex::new(Counters::default()),
            callbacks: Mutex::new(Vec::new()),
            config,
            runner: Mutex::new(None),
        }
    }

    pub fn subscribe(&self, callback: ProgressCallback) {
        self.callbacks.lock().unwrap().push(callback);
    }

    pub fn item_started(&self) {
        self.counters.lock().unwrap().in_progress += 1;
    }

    pub fn item_completed(&self, success: bool) {
        let mut counters = self.counters.lock().unwrap();
        counters.in_progress = counters.in_progress.saturating_sub(1);
        if success {
            counters.completed += 1;
        } else {
            counters.failed += 1;
        }
    }

    /// Record a job that was never dispatched (cancellation).
    pub fn item_skipped(&self) {
        self.counters.lock().unwrap().failed += 1;
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let counters = self.counters.lock().unwrap();
        let elapsed = self.started_at.elapsed().as_secs_f64();
        let finished = counters.completed + counters.failed;

        let rate = finished as f64 / elapsed.max(0.001);
        let remaining = self.total.saturating_sub(finished);
        let eta_seconds = if rate > 0.0 {
            remaining as f64 / rate.max(0.001)
        } else {
            0.0
        };

        ProgressSnapshot {
            total: self.total,
            completed: counters.completed,
            failed: counters.failed,
            in_progress: counters.in_progress,
            percent_complete: finished as f64 / self.total.max(1) as f64 * 100.0,
            elapsed_seconds: elapsed,
            items_per_second: rate,
            eta_seconds,
            success_rate: counters.completed as f64 / finished.max(1) as f64 * 100.0,
        }
    }

    /// Start the periodic reporter. No-op for empty batches or when
    /// already running.
    pub fn start(self: &Arc<Self>) {
        if self.total == 0 {
            return;
        }
        let mut runner = self.runner.lock().unwrap();
        if runner.is_some() {
            return;
        }

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let tracker = Arc::clone(self);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(tracker.config.report_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => tracker.report(),
                    _ = stop_rx.changed() => break,
                }
            }
        });

        *runner = Some(Runner { stop_tx, handle });
    }

    /// Stop the reporter, waiting briefly for the loop to exit. Safe to
    /// call repeatedly.
    pub async fn stop(&self) {
        let runner = self.runner.lock().unwrap().take();
        let Some(Runner { stop_tx, handle }) = runner else {
            return;
        };

        let _ = stop_tx.send(true);
        let abort = handle.abort_handle();
        if tokio::time::timeout(self.config.stop_timeout, handle)
            .await
            .is_err()
        {
            warn!("progress reporter did not exit in time, aborting");
            abort.abort();
        }
    }

    fn report(&self) {
        let snapshot = self.snapshot();
        info!(
            percent_complete = snapshot.percent_complete,
            completed = snapshot.completed,
            failed = snapshot.failed,
            in_progress = snapshot.in_progress,
            eta = %snapshot.eta_display(),
            "progress"
        );

        let callbacks: Vec<ProgressCallback> = self.callbacks.lock().unwrap().clone();
        for callback in callbacks {
            // A panicking subscriber must not kill the reporter
            if catch_unwind(AssertUnwindSafe(|| callback(&snapshot))).is_err() {
                warn!("progress callback panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn snapshot_math() {
        let tracker = ProgressTracker::new(10, ProgressConfig::default());
        for _ in 0..4 {
            tracker.item_started();
        }
        tracker.item_completed(true);
        tracker.item_completed(true);
        tracker.item_completed(false);

        let snap = tracker.snapshot();
        assert_eq!(snap.completed, 2);
        assert_eq!(snap.failed, 1);
        assert_eq!(snap.in_progress, 1);
        assert!((snap.percent_complete - 30.0).abs() < 1e-9);
        assert!((snap.success_rate - 200.0 / 3.0).abs() < 1e-6);
        assert!(snap.items_per_second > 0.0);
    }

    #[test]
    fn zero_total_does_not_divide_by_zero() {
        let tracker = ProgressTracker::new(0, ProgressConfig::default());
        let snap = tracker.snapshot();
        assert_eq!(snap.percent_complete, 0.0);
        assert_eq!(snap.eta_seconds, 0.0);
        assert_eq!(snap.success_rate, 0.0);
    }

    #[test]
    fn skipped_items_count_as_failed() {
        let tracker = ProgressTracker::new(3, ProgressConfig::default());
        tracker.item_skipped();
        tracker.item_skipped();
        let snap = tracker.snapshot();
        assert_eq!(snap.failed, 2);
        assert_eq!(snap.in_progress, 0);
    }

    #[test]
    fn eta_display_tiers() {
        let mut snap = ProgressTracker::new(1, ProgressConfig::default()).snapshot();
        snap.eta_seconds = 30.0;
        assert_eq!(snap.eta_display(), "30.0 seconds");
        snap.eta_seconds = 120.0;
        assert_eq!(snap.eta_display(), "2.0 minutes");
        snap.eta_seconds = 7200.0;
        assert_eq!(snap.eta_display(), "2.0 hours");
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_callback_does_not_kill_reporter() {
        let tracker = Arc::new(ProgressTracker::new(5, ProgressConfig::default()));
        let calls = Arc::new(AtomicUsize::new(0));

        tracker.subscribe(Arc::new(|_snap| panic!("subscriber bug")));
        let counter = Arc::clone(&calls);
        tracker.subscribe(Arc::new(move |_snap| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        tracker.start();
        tracker.start();
        tokio::time::sleep(Duration::from_millis(1600)).await;
        tracker.stop().await;
        tracker.stop().await;

        assert!(calls.load(Ordering::SeqCst) >= 2);
    }
}
