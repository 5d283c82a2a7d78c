//! Declarative auto-reconciliation rules: definitions, loading and evaluation

pub mod definition;
pub mod engine;
pub mod loader;

pub use definition::*;
pub use engine::*;
pub use loader::*;
