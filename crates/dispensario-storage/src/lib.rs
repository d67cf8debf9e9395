//! # dispensario-storage
//!
//! Storage abstraction layer for the dispensary server.
//!
//! This crate defines the traits and types that record storage backends
//! implement. It contains no implementation; backends live in separate
//! crates (`dispensario-db-memory` provides the in-memory one).
//!
//! ## Overview
//!
//! The main trait is [`RecordStorage`], which defines the contract for:
//! - CRUD operations (create, read, update, delete)
//! - Lifecycle status changes (the soft-removal path)
//! - List queries with filters, pagination and sorting
//!
//! ## Example
//!
//! ```ignore
//! use dispensario_storage::{RecordStorage, ListParams, FieldFilter};
//! use dispensario_core::RecordType;
//!
//! async fn patients_named(
//!     storage: &dyn RecordStorage,
//!     term: &str,
//! ) -> Result<SearchResult, StorageError> {
//!     let params = ListParams::new()
//!         .with_filter(FieldFilter::Contains {
//!             field: "familyNames".into(),
//!             value: term.into(),
//!         })
//!         .with_count(10);
//!     storage.search(RecordType::Patient, &params).await
//! }
//! ```

mod error;
mod traits;
mod types;

pub use error::{ErrorCategory, StorageError};
pub use traits::{RecordStorage, StorageCapabilities};
pub use types::{FieldFilter, ListParams, SearchResult, SortParam};

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Type alias for a shared storage trait object.
pub type DynStorage = std::sync::Arc<dyn RecordStorage>;
