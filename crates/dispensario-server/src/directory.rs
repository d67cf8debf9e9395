//! User lookup for the authentication middleware, backed by the record store.

use async_trait::async_trait;
use std::str::FromStr;

use dispensario_auth::{AuthError, DirectoryUser, Role, UserDirectory};
use dispensario_core::{RecordEnvelope, RecordType};
use dispensario_storage::{DynStorage, RecordStorage, StorageError};

pub struct StorageUserDirectory {
    storage: DynStorage,
}

impl StorageUserDirectory {
    pub fn new(storage: DynStorage) -> Self {
        Self { storage }
    }
}

/// Map a stored user record to the directory view the middleware consumes.
pub fn directory_user_from_record(record: &RecordEnvelope) -> Result<DirectoryUser, AuthError> {
    let role = record
        .str_field("role")
        .ok_or_else(|| AuthError::internal(format!("user {} has no role", record.id)))?;
    let companies = record
        .field("companies")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(DirectoryUser {
        id: record.id.clone(),
        username: record.str_field("username").unwrap_or_default().to_string(),
        name: record
            .str_field("name")
            .unwrap_or(record.str_field("username").unwrap_or_default())
            .to_string(),
        role: Role::from_str(role)?,
        companies,
        active: record.is_active(),
    })
}

#[async_trait]
impl UserDirectory for StorageUserDirectory {
    async fn find_by_id(&self, id: &str) -> Result<Option<DirectoryUser>, AuthError> {
        match self.storage.read(RecordType::User, id).await {
            Ok(Some(record)) => Ok(Some(directory_user_from_record(&record)?)),
            Ok(None) => Ok(None),
            // A soft-removed user no longer authenticates
            Err(StorageError::Gone { .. }) => Ok(None),
            Err(e) => Err(AuthError::internal(e.to_string())),
        }
    }
}
