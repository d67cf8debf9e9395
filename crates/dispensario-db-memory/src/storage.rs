use crate::query;
use async_trait::async_trait;
use dispensario_core::{RecordEnvelope, RecordStatus, RecordType, generate_id};
use dispensario_storage::{ListParams, RecordStorage, SearchResult, StorageError};
use papaya::HashMap as PapayaHashMap;
use std::sync::Arc;

pub type StorageKey = String; // Format: "RecordType/id"

pub(crate) fn make_storage_key(record_type: RecordType, id: &str) -> StorageKey {
    format!("{record_type}/{id}")
}

/// In-memory record storage backend using a papaya lock-free HashMap.
///
/// Rows are keyed `RecordType/id`. Soft removal keeps the row under an
/// INACTIVO status; reads of such rows answer `Gone`.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    data: Arc<PapayaHashMap<StorageKey, RecordEnvelope>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            data: Arc::new(PapayaHashMap::new()),
        }
    }

    fn get_raw(&self, record_type: RecordType, id: &str) -> Option<RecordEnvelope> {
        let key = make_storage_key(record_type, id);
        let guard = self.data.pin();
        guard.get(&key).cloned()
    }
}

#[async_trait]
impl RecordStorage for InMemoryStorage {
    async fn create(&self, mut record: RecordEnvelope) -> Result<RecordEnvelope, StorageError> {
        if record.id.is_empty() {
            record.id = generate_id();
        }
        let key = make_storage_key(record.record_type, &record.id);
        let guard = self.data.pin();

        if guard.get(&key).is_some() {
            return Err(StorageError::already_exists(
                record.record_type.to_string(),
                record.id,
            ));
        }

        guard.insert(key, record.clone());
        Ok(record)
    }

    async fn read(
        &self,
        record_type: RecordType,
        id: &str,
    ) -> Result<Option<RecordEnvelope>, StorageError> {
        match self.get_raw(record_type, id) {
            Some(record) if record.status == RecordStatus::Inactive => {
                Err(StorageError::gone(record_type.to_string(), id))
            }
            other => Ok(other),
        }
    }

    async fn update(
        &self,
        record_type: RecordType,
        id: &str,
        mut record: RecordEnvelope,
    ) -> Result<RecordEnvelope, StorageError> {
        let key = make_storage_key(record_type, id);
        let guard = self.data.pin();

        let existing = guard
            .get(&key)
            .ok_or_else(|| StorageError::not_found(record_type.to_string(), id))?;

        if existing.status == RecordStatus::Inactive {
            return Err(StorageError::gone(record_type.to_string(), id));
        }

        // The path wins over whatever the payload claims
        record.id = id.to_string();
        record.record_type = record_type;
        record.meta.created_at = existing.meta.created_at.clone();
        record.touch();

        guard.insert(key, record.clone());
        Ok(record)
    }

    async fn set_status(
        &self,
        record_type: RecordType,
        id: &str,
        status: RecordStatus,
    ) -> Result<RecordEnvelope, StorageError> {
        let key = make_storage_key(record_type, id);
        let guard = self.data.pin();

        let mut record = guard
            .get(&key)
            .ok_or_else(|| StorageError::not_found(record_type.to_string(), id))?
            .clone();

        record.status = status;
        record.touch();

        guard.insert(key, record.clone());
        Ok(record)
    }

    async fn delete(&self, record_type: RecordType, id: &str) -> Result<(), StorageError> {
        let key = make_storage_key(record_type, id);
        let guard = self.data.pin();

        if guard.remove(&key).is_none() {
            return Err(StorageError::not_found(record_type.to_string(), id));
        }
        Ok(())
    }

    async fn search(
        &self,
        record_type: RecordType,
        params: &ListParams,
    ) -> Result<SearchResult, StorageError> {
        let prefix = format!("{record_type}/");
        let guard = self.data.pin();

        let mut matching: Vec<RecordEnvelope> = guard
            .iter()
            .filter(|(key, record)| key.starts_with(&prefix) && query::matches(record, params))
            .map(|(_, record)| record.clone())
            .collect();

        if let Some(sort) = &params.sort {
            query::sort_records(&mut matching, &sort.field, sort.descending);
        } else {
            // Stable default ordering for paginated clients
            query::sort_records(&mut matching, "createdAt", false);
        }

        let total = matching.len() as u64;
        let offset = params.offset.unwrap_or(0);
        let count = params.count.unwrap_or(u32::MAX);

        let page: Vec<RecordEnvelope> = matching
            .into_iter()
            .skip(offset as usize)
            .take(count as usize)
            .collect();

        let has_more = u64::from(offset) + (page.len() as u64) < total;

        Ok(SearchResult {
            records: page,
            total,
            offset,
            has_more,
        })
    }

    async fn count(&self, record_type: RecordType) -> Result<u64, StorageError> {
        let prefix = format!("{record_type}/");
        let guard = self.data.pin();
        let n = guard
            .iter()
            .filter(|(key, record)| {
                key.starts_with(&prefix) && record.status != RecordStatus::Inactive
            })
            .count();
        Ok(n as u64)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
