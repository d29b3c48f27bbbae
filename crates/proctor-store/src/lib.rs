//! proctor-store — Autosave stores and configuration.
//!
//! Implements the `AttemptStore` trait for a JSON file and for process
//! memory, and loads `proctor.toml`.

pub mod config;
pub mod error;
pub mod file;
pub mod memory;

pub use config::{load_config, load_config_from, ProctorConfig};
pub use error::StoreError;
pub use file::FileStore;
pub use memory::MemoryStore;
