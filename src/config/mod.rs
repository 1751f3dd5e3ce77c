//! Configuration model for agentlock.
//!
//! This module defines the Config struct that represents `.agentlock.yaml`.
//! It supports forward-compatible YAML parsing (unknown fields are ignored),
//! sensible defaults for every field, and validation of config values.
//! The file is loaded once at process start and never mutated afterwards.

mod model;
mod operations;
pub mod types;


// Re-export public API
pub use model::Config;
pub use types::{CONFIG_FILE_NAME, StoreFailurePolicy};
