//! BlobStore adapters - session-history payloads.

mod filesystem;
mod in_memory;

pub use filesystem::FilesystemBlobStore;
pub use in_memory::InMemoryBlobStore;
