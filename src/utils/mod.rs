//! Field validators, text helpers and in-memory collaborators

pub mod memory_storage;
pub mod validation;

pub use memory_storage::*;
pub use validation::*;
