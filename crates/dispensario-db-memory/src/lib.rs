//! In-memory record storage backend for the dispensary server.
//!
//! This crate provides an in-memory implementation of the `RecordStorage`
//! trait from `dispensario-storage`, using a papaya lock-free HashMap for
//! concurrent access.
//!
//! # Example
//!
//! ```ignore
//! use dispensario_db_memory::InMemoryStorage;
//! use dispensario_storage::RecordStorage;
//!
//! let storage = InMemoryStorage::new();
//! let created = storage.create(record).await?;
//! ```

pub mod query;
pub mod storage;

pub use dispensario_storage::{RecordStorage, StorageError};
pub use storage::{InMemoryStorage, StorageKey};

/// Creates a new shareable in-memory storage instance.
pub fn create_storage() -> dispensario_storage::DynStorage {
    std::sync::Arc::new(InMemoryStorage::new())
}
