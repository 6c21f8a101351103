//! State backend implementations.
//!
//! Two pluggable backends:
//! - File (flat JSON document)
//! - Memory (tests and throwaway runs)

pub mod file;
pub mod memory;

pub use file::FileBackend;
pub use memory::MemoryBackend;
