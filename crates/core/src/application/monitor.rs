// Background resource monitor with hysteretic throttling

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::application::scheduler::constants::{
    DEFAULT_HYSTERESIS_MARGIN, DEFAULT_MEMORY_THROTTLE_THRESHOLD, DEFAULT_SAMPLE_INTERVAL,
    LOOP_STOP_TIMEOUT,
};
use crate::port::{ResourceProbe, ResourceSample, TimeProvider};

/// Monitor configuration
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub sample_interval: Duration,
    /// Memory percent at which the throttle flag sets
    pub memory_threshold_percent: f32,
    /// Dead-band: the flag clears only below threshold - margin
    pub hysteresis_margin: f32,
    pub stop_timeout: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
            memory_threshold_percent: DEFAULT_MEMORY_THROTTLE_THRESHOLD,
            hysteresis_margin: DEFAULT_HYSTERESIS_MARGIN,
            stop_timeout: LOOP_STOP_TIMEOUT,
        }
    }
}

/// Read-only view of the monitor's current state
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceSnapshot {
    pub cpu_percent: f32,
    pub memory_percent: f32,
    pub available_memory_mb: u64,
    pub peak_cpu_percent: f32,
    pub peak_memory_percent: f32,
    /// Epoch ms of the last successful sample; 0 before the first one
    pub timestamp_ms: i64,
}

#[derive(Default)]
struct MonitorState {
    last: Option<ResourceSample>,
    last_timestamp_ms: i64,
    peak_cpu: f32,
    peak_memory: f32,
    throttled: bool,
    failed_samples: u64,
}

struct Runner {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Samples a `ResourceProbe` on a background loop, tracking peaks and a
/// hysteretic memory-throttle flag.
///
/// A failed sample is logged and skipped; the loop never dies from one
/// `ProbeError`.
pub struct ResourceMonitor {
    probe: Arc<dyn ResourceProbe>,
    time: Arc<dyn TimeProvider>,
    config: MonitorConfig,
    state: Arc<Mutex<MonitorState>>,
    runner: Mutex<Option<Runner>>,
}

impl ResourceMonitor {
    pub fn new(
        probe: Arc<dyn ResourceProbe>,
        time: Arc<dyn TimeProvider>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            probe,
            time,
            config,
            state: Arc::new(Mutex::new(MonitorState::default())),
            runner: Mutex::new(None),
        }
    }

    /// Begin background sampling. Idempotent: a running monitor is left
    /// alone.
    pub fn start(&self) {
        let mut runner = self.runner.lock().unwrap();
        if runner.is_some() {
            return;
        }

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let probe = Arc::clone(&self.probe);
        let time = Arc::clone(&self.time);
        let config = self.config.clone();
        let state = Arc::clone(&self.state);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(config.sample_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        Self::sample_once(&probe, &time, &config, &state);
                    }
                    _ = stop_rx.changed() => break,
                }
            }
        });

        *runner = Some(Runner { stop_tx, handle });
    }

    /// Signal the loop to end and wait up to `stop_timeout` for it. Safe
    /// to call repeatedly.
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
            warn!("resource monitor loop did not exit in time, aborting");
            abort.abort();
        }
    }

    /// Perform exactly one sampling iteration.
    ///
    /// The background loop calls this on its timer; tests call it directly
    /// to drive hysteresis without timing races.
    pub fn tick(&self) -> Option<ResourceSample> {
        Self::sample_once(&self.probe, &self.time, &self.config, &self.state)
    }

    pub fn should_throttle(&self) -> bool {
        self.state.lock().unwrap().throttled
    }

    pub fn snapshot(&self) -> ResourceSnapshot {
        let state = self.state.lock().unwrap();
        let (cpu, memory, available) = match &state.last {
            Some(s) => (
                s.cpu_percent,
                s.memory_percent,
                s.memory_total_mb.saturating_sub(s.memory_used_mb),
            ),
            None => (0.0, 0.0, 0),
        };
        ResourceSnapshot {
            cpu_percent: cpu,
            memory_percent: memory,
            available_memory_mb: available,
            peak_cpu_percent: state.peak_cpu,
            peak_memory_percent: state.peak_memory,
            timestamp_ms: state.last_timestamp_ms,
        }
    }

    /// Last sample, if any iteration has succeeded yet.
    pub fn last_sample(&self) -> Option<ResourceSample> {
        self.state.lock().unwrap().last
    }

    fn sample_once(
        probe: &Arc<dyn ResourceProbe>,
        time: &Arc<dyn TimeProvider>,
        config: &MonitorConfig,
        state: &Arc<Mutex<MonitorState>>,
    ) -> Option<ResourceSample> {
        let sample = match probe.sample() {
            Ok(sample) => sample,
            Err(e) => {
                let mut state = state.lock().unwrap();
                state.failed_samples += 1;
                warn!(error = %e, failed_samples = state.failed_samples, "resource sample failed");
                return None;
            }
        };

        let now_ms = time.now_millis();
        let mut state = state.lock().unwrap();
        state.last = Some(sample);
        state.last_timestamp_ms = now_ms;
        state.peak_cpu = state.peak_cpu.max(sample.cpu_percent);
        state.peak_memory = state.peak_memory.max(sample.memory_percent);

        let set_at = config.memory_threshold_percent;
        let clear_below = config.memory_threshold_percent - config.hysteresis_margin;
        if !state.throttled && sample.memory_percent > set_at {
            state.throttled = true;
            warn!(
                memory_percent = sample.memory_percent,
                threshold = set_at,
                "memory pressure high, throttle engaged"
            );
        } else if state.throttled && sample.memory_percent < clear_below {
            state.throttled = false;
            info!(
                memory_percent = sample.memory_percent,
                clear_below, "memory pressure eased, throttle released"
            );
        }

        debug!(
            cpu_percent = sample.cpu_percent,
            memory_percent = sample.memory_percent,
            throttled = state.throttled,
            "resource sample"
        );
        Some(sample)
    }
}
