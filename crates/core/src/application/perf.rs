// Performance reporting sink

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::Result;
use crate::port::TimeProvider;

/// Aggregated timings for one named operation
#[derive(Debug, Clone, Serialize)]
pub struct OperationStats {
    pub name: String,
    pub count: usize,
    pub average_seconds: f64,
    pub min_seconds: f64,
    pub max_seconds: f64,
    pub total_seconds: f64,
    /// Sample standard deviation; absent below two measurements
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdev_seconds: Option<f64>,
}

/// JSON-serializable performance report
///
/// A disabled monitor reports `{"enabled": false}` and nothing else.
#[derive(Debug, Serialize)]
pub struct PerfReport {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_runtime_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operations: Option<Vec<OperationStats>>,
}

struct PerfState {
    started_at_ms: i64,
    operations: BTreeMap<String, Vec<f64>>,
}

/// Records named operation timings and renders them as a report.
pub struct PerfMonitor {
    enabled: bool,
    time: Arc<dyn TimeProvider>,
    state: Mutex<PerfState>,
}

impl PerfMonitor {
    pub fn new(enabled: bool, time: Arc<dyn TimeProvider>) -> Self {
        let started_at_ms = time.now_millis();
        Self {
            enabled,
            time,
            state: Mutex::new(PerfState {
                started_at_ms,
                operations: BTreeMap::new(),
            }),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Record one timing for `operation`. No-op when disabled.
    pub fn record(&self, operation: &str, seconds: f64) {
        if !self.enabled {
            return;
        }
        let mut state = self.state.lock().unwrap();
        state
            .operations
            .entry(operation.to_string())
            .or_default()
            .push(seconds);
    }

    /// RAII guard recording the elapsed time of a scope on drop.
    pub fn timed(&self, operation: &str) -> TimedOperation<'_> {
        TimedOperation {
            monitor: self,
            operation: operation.to_string(),
            started: Instant::now(),
        }
    }

    pub fn operation_stats(&self, operation: &str) -> Option<OperationStats> {
        if !self.enabled {
            return None;
        }
        let state = self.state.lock().unwrap();
        state
            .operations
            .get(operation)
            .map(|times| Self::stats_for(operation, times))
    }

    pub fn report(&self) -> PerfReport {
        if !self.enabled {
            return PerfReport {
                enabled: false,
                total_runtime_seconds: None,
                start_time: None,
                end_time: None,
                operations: None,
            };
        }

        let state = self.state.lock().unwrap();
        let now_ms = self.time.now_millis();
        let operations = state
            .operations
            .iter()
            .map(|(name, times)| Self::stats_for(name, times))
            .collect();

        PerfReport {
            enabled: true,
            total_runtime_seconds: Some((now_ms - state.started_at_ms) as f64 / 1000.0),
            start_time: Some(rfc3339_of(state.started_at_ms)),
            end_time: Some(self.time.now_rfc3339()),
            operations: Some(operations),
        }
    }

    /// Write the pretty-printed report to `path`. A disabled monitor
    /// warns and writes nothing.
    pub fn save(&self, path: &Path) -> Result<()> {
        if !self.enabled {
            warn!("performance monitor is disabled, not saving report");
            return Ok(());
        }

        let report = self.report();
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)?;
        info!(path = %path.display(), "performance report saved");
        Ok(())
    }

    /// Drop all recorded timings and restart the runtime clock.
    pub fn reset(&self) {
        let mut state = self.state.lock().unwrap();
        state.operations.clear();
        state.started_at_ms = self.time.now_millis();
    }

    fn stats_for(name: &str, times: &[f64]) -> OperationStats {
        let count = times.len();
        let total: f64 = times.iter().sum();
        let average = if count > 0 { total / count as f64 } else { 0.0 };
        let min = times.iter().copied().fold(f64::INFINITY, f64::min);
        let max = times.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let stdev = if count >= 2 {
            let variance = times
                .iter()
                .map(|t| (t - average).powi(2))
                .sum::<f64>()
                / (count - 1) as f64;
            Some(variance.sqrt())
        } else {
            None
        };

        OperationStats {
            name: name.to_string(),
            count,
            average_seconds: average,
            min_seconds: if count > 0 { min } else { 0.0 },
            max_seconds: if count > 0 { max } else { 0.0 },
            total_seconds: total,
            stdev_seconds: stdev,
        }
    }
}

/// Scope timer; records into the monitor when dropped.
pub struct TimedOperation<'a> {
    monitor: &'a PerfMonitor,
    operation: String,
    started: Instant,
}

impl Drop for TimedOperation<'_> {
    fn drop(&mut self) {
        self.monitor
            .record(&self.operation, self.started.elapsed().as_secs_f64());
    }
}

fn rfc3339_of(epoch_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(epoch_ms)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default()
}
