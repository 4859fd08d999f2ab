// docbatch-infra-system - OS adapters
// Implements: ResourceProbe, JobExecutor, SecurityValidator, FileClassifier,
// FileWalker

pub mod extension_classifier;
pub mod logging;
pub mod path_guard;
pub mod subprocess_executor;
pub mod sysinfo_probe;
pub mod walker;

pub use extension_classifier::ExtensionClassifier;
pub use logging::init_logging;
pub use path_guard::PathGuard;
pub use subprocess_executor::{CommandOutput, CommandSpec, SubprocessExecutor};
pub use sysinfo_probe::SysinfoProbe;
pub use walker::WalkdirWalker;
