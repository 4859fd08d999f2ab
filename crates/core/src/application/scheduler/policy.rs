// Worker-count policy
//
// Evaluated once per batch, before the pool launches. Recomputing per task
// would chase the load average and churn the pool.

use tracing::warn;

use crate::port::ResourceSample;

use super::constants::{
    CPU_HARD_THRESHOLD, CPU_SOFT_THRESHOLD, MEMORY_HARD_THRESHOLD, MEMORY_SOFT_THRESHOLD,
};

/// Pick the pool size from a resource reading and static bounds.
///
/// `sample` is None when the probe failed; selection then falls back to
/// `max_workers` rather than guessing at pressure.
pub fn select_worker_count(
    sample: Option<&ResourceSample>,
    throttled: bool,
    min_workers: usize,
    max_workers: usize,
) -> usize {
    let min_workers = min_workers.max(1);
    let max_workers = max_workers.max(min_workers);

    let Some(sample) = sample else {
        warn!(
            fallback_workers = max_workers,
            "resource probe failed, skipping adaptive sizing"
        );
        return max_workers;
    };

    if throttled {
        return min_workers;
    }

    let cpu = sample.cpu_percent;
    let mem = sample.memory_percent;

    if cpu > CPU_HARD_THRESHOLD || mem > MEMORY_HARD_THRESHOLD {
        min_workers
    } else if cpu > CPU_SOFT_THRESHOLD || mem > MEMORY_SOFT_THRESHOLD {
        min_workers.max(max_workers / 2)
    } else {
        max_workers
    }
}
