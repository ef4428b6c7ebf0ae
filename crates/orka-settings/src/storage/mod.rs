//! Storage implementations.

pub mod file;
pub mod memory;

pub use file::JsonFileSettings;
pub use memory::MemorySettings;
