//! Storage layer
//!
//! Local key-value storage for drafts and the file helpers shared with the
//! content reader and the local backend.
//!
//! ## Stores
//!
//! - **MemoryStore**: in-process map, lost on exit
//! - **FileStore**: a JSON object in a single file, written atomically

pub mod error;
pub mod kv;

pub use error::{StorageError, StorageResult};
pub use kv::{atomic_write, FileStore, KeyValueStore, MemoryStore};
