// System resource probing port

use thiserror::Error;

/// Point-in-time system resource reading.
#[derive(Debug, Clone, Copy)]
pub struct ResourceSample {
    pub cpu_percent: f32,
    pub memory_percent: f32,
    pub memory_used_mb: u64,
    pub memory_total_mb: u64,
}

/// Probe errors
#[derive(Error, Debug, Clone)]
pub enum ProbeError {
    #[error("Probe backend unavailable: {0}")]
    Unavailable(String),

    #[error("Probe read failed: {0}")]
    ReadFailed(String),
}

/// Resource probe port
///
/// Drives worker-count selection and memory-throttle decisions. A failed
/// read is a typed error, never a stale sample.
pub trait ResourceProbe: Send + Sync {
    /// Take one CPU/memory reading.
    fn sample(&self) -> Result<ResourceSample, ProbeError>;

    /// Resident memory of the current process in MB.
    ///
    /// Used for per-job memory deltas; None when the platform cannot
    /// report it.
    fn process_memory_mb(&self) -> Option<f64>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Build a consistent sample from percentages (8 GiB nominal total).
    pub fn sample(cpu_percent: f32, memory_percent: f32) -> ResourceSample {
        let memory_total_mb = 8192;
        ResourceSample {
            cpu_percent,
            memory_percent,
            memory_used_mb: (memory_total_mb as f32 * memory_percent / 100.0) as u64,
            memory_total_mb,
        }
    }

    /// Mock probe returning a settable fixed sample
    pub struct MockResourceProbe {
        current: Arc<Mutex<ResourceSample>>,
        process_memory_mb: Arc<Mutex<Option<f64>>>,
    }

    impl MockResourceProbe {
        pub fn new(cpu_percent: f32, memory_percent: f32) -> Self {
            Self {
                current: Arc::new(Mutex::new(sample(cpu_percent, memory_percent))),
                process_memory_mb: Arc::new(Mutex::new(Some(128.0))),
            }
        }

        pub fn set_cpu(&self, cpu_percent: f32) {
            self.current.lock().unwrap().cpu_percent = cpu_percent;
        }

        pub fn set_memory(&self, memory_percent: f32) {
            let mut current = self.current.lock().unwrap();
            *current = sample(current.cpu_percent, memory_percent);
        }

        pub fn set_process_memory(&self, mb: Option<f64>) {
            *self.process_memory_mb.lock().unwrap() = mb;
        }
    }

    impl ResourceProbe for MockResourceProbe {
        fn sample(&self) -> Result<ResourceSample, ProbeError> {
            Ok(*self.current.lock().unwrap())
        }

        fn process_memory_mb(&self) -> Option<f64> {
            *self.process_memory_mb.lock().unwrap()
        }
    }

    /// Probe that replays a fixed sequence of samples, one per call.
    ///
    /// After the sequence is exhausted the last sample repeats.
    pub struct ScriptedResourceProbe {
        samples: Vec<ResourceSample>,
        cursor: Arc<Mutex<usize>>,
    }

    impl ScriptedResourceProbe {
        pub fn new(samples: Vec<ResourceSample>) -> Self {
            assert!(!samples.is_empty(), "script needs at least one sample");
            Self {
                samples,
                cursor: Arc::new(Mutex::new(0)),
            }
        }

        pub fn from_memory_percents(percents: &[f32]) -> Self {
            Self::new(percents.iter().map(|&m| sample(10.0, m)).collect())
        }

        pub fn calls(&self) -> usize {
            *self.cursor.lock().unwrap()
        }
    }

    impl ResourceProbe for ScriptedResourceProbe {
        fn sample(&self) -> Result<ResourceSample, ProbeError> {
            let mut cursor = self.cursor.lock().unwrap();
            let index = (*cursor).min(self.samples.len() - 1);
            *cursor += 1;
            Ok(self.samples[index])
        }

        fn process_memory_mb(&self) -> Option<f64> {
            Some(128.0)
        }
    }

    /// Probe whose every read fails
    pub struct FailingResourceProbe;

    impl ResourceProbe for FailingResourceProbe {
        fn sample(&self) -> Result<ResourceSample, ProbeError> {
            Err(ProbeError::ReadFailed("injected probe failure".to_string()))
        }

        fn process_memory_mb(&self) -> Option<f64> {
            None
        }
    }
}
