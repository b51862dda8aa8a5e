//! Persistence of sessions, action logs, results and configurations.

pub mod base;
pub mod file;
pub mod memory;

pub use base::{apply_update, StoreError, StoreResult, TestStore};
pub use file::FileStore;
pub use memory::MemoryStore;
