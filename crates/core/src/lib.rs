// docbatch-core - Resource-adaptive batch execution engine
//
// Hexagonal layout: domain entities, port traits and application services.
// OS-facing adapters (probe, subprocess executor, walker, path guard) live
// in docbatch-infra-system.

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use error::{EngineError, Result};

/// Engine crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
