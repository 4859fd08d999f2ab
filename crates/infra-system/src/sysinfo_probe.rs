// Resource probe backed by the sysinfo crate

use std::sync::Mutex;

use sysinfo::System;
use tracing::debug;

use docbatch_core::port::{ProbeError, ResourceProbe, ResourceSample};

const BYTES_PER_MB: u64 = 1024 * 1024;

/// System-wide CPU and memory readings via `sysinfo`.
///
/// The first CPU reading after construction is typically 0; usage numbers
/// become meaningful once samples are spaced out, which the monitor's
/// periodic loop provides.
pub struct SysinfoProbe {
    system: Mutex<System>,
}

impl SysinfoProbe {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new_all()),
        }
    }
}

impl Default for SysinfoProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceProbe for SysinfoProbe {
    fn sample(&self) -> Result<ResourceSample, ProbeError> {
        let mut sys = self
            .system
            .lock()
            .map_err(|_| ProbeError::Unavailable("probe state poisoned".to_string()))?;

        sys.refresh_cpu();
        sys.refresh_memory();

        let cpu_percent = sys.global_cpu_info().cpu_usage();
        let memory_used_mb = sys.used_memory() / BYTES_PER_MB;
        let memory_total_mb = sys.total_memory() / BYTES_PER_MB;
        let memory_percent = if memory_total_mb == 0 {
            0.0
        } else {
            (memory_used_mb as f32 / memory_total_mb as f32) * 100.0
        };

        debug!(
            cpu = %cpu_percent,
            mem_used_mb = %memory_used_mb,
            mem_total_mb = %memory_total_mb,
            "resource sample collected"
        );

        Ok(ResourceSample {
            cpu_percent,
            memory_percent,
            memory_used_mb,
            memory_total_mb,
        })
    }

    fn process_memory_mb(&self) -> Option<f64> {
        let pid = sysinfo::get_current_pid().ok()?;
        let mut sys = self.system.lock().ok()?;
        if !sys.refresh_process(pid) {
            return None;
        }
        sys.process(pid)
            .map(|p| p.memory() as f64 / BYTES_PER_MB as f64)
    }
}
