//! Persistence layer: durable key-value storage for progress and telemetry.

pub mod file;
pub mod memory;
pub mod traits;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use traits::KeyValueStorage;
