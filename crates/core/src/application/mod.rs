// Application Layer - Batch execution services over the domain and ports

pub mod monitor;
pub mod orchestrator;
pub mod perf;
pub mod progress;
pub mod scheduler;

pub use monitor::{MonitorConfig, ResourceMonitor, ResourceSnapshot};
pub use orchestrator::{
    DirectoryOptions, DirectoryOrchestrator, OrchestratorConfig, PlannedFile, ProcessingMode,
};
pub use perf::{OperationStats, PerfMonitor, PerfReport};
pub use progress::{ProgressCallback, ProgressConfig, ProgressSnapshot, ProgressTracker};
pub use scheduler::{
    cancel_channel, make_jobs, BatchOptions, CancelHandle, CancelToken, SchedulerConfig,
    TaskScheduler, WorkerTracker,
};
