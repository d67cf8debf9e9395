//! Storage traits for the dispensary record store.
//!
//! This module defines the contract all storage backends implement.

use async_trait::async_trait;

use crate::error::StorageError;
use crate::types::{ListParams, SearchResult};
use dispensario_core::{RecordEnvelope, RecordStatus, RecordType};

/// The main storage trait all record backends must implement.
///
/// The contract covers CRUD, status changes (soft removal) and list queries.
/// Implementations must be thread-safe (`Send + Sync`).
///
/// # Example
///
/// ```ignore
/// use dispensario_storage::{RecordStorage, StorageError};
/// use dispensario_core::RecordType;
///
/// async fn get_patient(
///     storage: &dyn RecordStorage,
///     id: &str,
/// ) -> Result<RecordEnvelope, StorageError> {
///     storage
///         .read(RecordType::Patient, id)
///         .await?
///         .ok_or_else(|| StorageError::not_found("Patient", id))
/// }
/// ```
#[async_trait]
pub trait RecordStorage: Send + Sync {
    /// Creates a new record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::AlreadyExists` if a record with the same type
    /// and ID exists (including soft-removed ones).
    async fn create(&self, record: RecordEnvelope) -> Result<RecordEnvelope, StorageError>;

    /// Reads a record by type and ID.
    ///
    /// Returns `None` if the record does not exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Gone` for soft-removed (INACTIVO) records, so
    /// callers can distinguish "never existed" from "removed". Suspended and
    /// finished records read normally; they are clinical history.
    async fn read(
        &self,
        record_type: RecordType,
        id: &str,
    ) -> Result<Option<RecordEnvelope>, StorageError>;

    /// Replaces an existing record's fields. The stored `meta.created_at` is
    /// preserved; `meta.last_updated` is refreshed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the record does not exist, and
    /// `StorageError::Gone` if it was soft-removed.
    async fn update(
        &self,
        record_type: RecordType,
        id: &str,
        record: RecordEnvelope,
    ) -> Result<RecordEnvelope, StorageError>;

    /// Changes a record's lifecycle status in place (the soft-removal path:
    /// suspending an attention, deactivating a patient or user).
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the record does not exist.
    async fn set_status(
        &self,
        record_type: RecordType,
        id: &str,
        status: RecordStatus,
    ) -> Result<RecordEnvelope, StorageError>;

    /// Physically removes a record. Used for operational rows (appointments,
    /// diagnoses, procedures, prescriptions, activities); clinical history
    /// goes through `set_status` instead.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the record does not exist.
    async fn delete(&self, record_type: RecordType, id: &str) -> Result<(), StorageError>;

    /// Lists records of a type matching the given parameters.
    async fn search(
        &self,
        record_type: RecordType,
        params: &ListParams,
    ) -> Result<SearchResult, StorageError>;

    /// Counts non-terminal records of a type.
    async fn count(&self, record_type: RecordType) -> Result<u64, StorageError>;

    /// Returns the name of this storage backend for logging/debugging.
    fn backend_name(&self) -> &'static str;
}

/// Extension trait for storage capability queries.
pub trait StorageCapabilities {
    /// Returns whether list queries can be sorted by arbitrary fields.
    fn supports_sorting(&self) -> bool {
        true
    }

    /// Returns the supported filter fields for a record type, `None` meaning
    /// any field.
    fn supported_filter_fields(&self, _record_type: RecordType) -> Option<Vec<String>> {
        None
    }
}
