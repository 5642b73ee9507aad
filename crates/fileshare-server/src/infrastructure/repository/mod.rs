//! Repository adapters implementing [`crate::application::repository::FileRepository`].
//!
//! - **`fs`**     – A directory on disk; what the server binary uses.
//! - **`memory`** – A fixed set of named byte buffers, for tests and tools.

pub mod fs;
pub mod memory;

pub use fs::FsRepository;
pub use memory::MemoryRepository;
