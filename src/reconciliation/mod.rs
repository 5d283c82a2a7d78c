//! Reconciliation orchestrator, run statistics and reports

pub mod core;
pub mod report;
pub mod statistics;

pub use self::core::*;
pub use report::*;
pub use statistics::*;
