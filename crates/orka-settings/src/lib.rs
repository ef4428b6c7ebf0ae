//! Settings storage for the Orka agent hub.
//!
//! Provides:
//! - `MemorySettings` - Volatile store for tests and throwaway hubs
//! - `JsonFileSettings` - Store persisted to a JSON document

pub mod storage;

pub use storage::{JsonFileSettings, MemorySettings};
