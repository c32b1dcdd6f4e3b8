/// In-process implementation of every collaborator contract.
pub mod memory;

pub use memory::MemoryBackend;
