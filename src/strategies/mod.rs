//! Matching strategies tried by the reconciliation engine in cascade order

pub mod base;
pub mod exact;
pub mod rule_based;

pub use base::*;
pub use exact::*;
pub use rule_based::*;
