// Scheduler constants (no magic values)
use std::time::Duration;

/// Lower bound on the worker pool, even under heavy pressure
pub const DEFAULT_MIN_WORKERS: usize = 2;

/// Cap on the default worker pool regardless of core count
pub const DEFAULT_MAX_WORKERS_CAP: usize = 32;

/// CPU usage above this forces the pool to its minimum size (percent)
pub const CPU_HARD_THRESHOLD: f32 = 90.0;

/// Memory usage above this forces the pool to its minimum size (percent)
pub const MEMORY_HARD_THRESHOLD: f32 = 90.0;

/// CPU usage above this halves the pool (percent)
pub const CPU_SOFT_THRESHOLD: f32 = 70.0;

/// Memory usage above this halves the pool (percent)
pub const MEMORY_SOFT_THRESHOLD: f32 = 70.0;

/// Memory usage at which the monitor raises its throttle flag (percent)
pub const DEFAULT_MEMORY_THROTTLE_THRESHOLD: f32 = 85.0;

/// Hysteresis dead-band below the throttle threshold (percent points)
pub const DEFAULT_HYSTERESIS_MARGIN: f32 = 5.0;

/// Background resource sampling period
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_secs(2);

/// Progress reporter period
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// Bounded wait for a background loop to exit on stop()
pub const LOOP_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Default worker pool upper bound: core count clamped to
/// [DEFAULT_MIN_WORKERS, DEFAULT_MAX_WORKERS_CAP]
pub fn default_max_workers() -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(DEFAULT_MIN_WORKERS);
    cores.clamp(DEFAULT_MIN_WORKERS, DEFAULT_MAX_WORKERS_CAP)
}
