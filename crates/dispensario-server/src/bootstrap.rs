//! Startup seeding: the initial admin user.

use serde_json::json;

use dispensario_auth::hash_password;
use dispensario_core::{RecordEnvelope, RecordType, generate_id, normalize_company_code};
use dispensario_storage::{DynStorage, FieldFilter, ListParams, RecordStorage};

use crate::config::BootstrapConfig;

/// Create the configured admin user when its username is still free.
pub async fn seed(config: &BootstrapConfig, storage: &DynStorage) -> anyhow::Result<()> {
    let Some(admin) = &config.admin_user else {
        return Ok(());
    };

    let taken = storage
        .search(
            RecordType::User,
            &ListParams::new()
                .with_filter(FieldFilter::Exact {
                    field: "username".into(),
                    value: admin.username.clone(),
                })
                .with_inactive(),
        )
        .await?;
    if !taken.is_empty() {
        tracing::debug!(username = %admin.username, "bootstrap admin already exists");
        return Ok(());
    }

    let mut record = RecordEnvelope::new(generate_id(), RecordType::User);
    record.set_field("username", json!(admin.username));
    record.set_field(
        "name",
        json!(admin.name.clone().unwrap_or_else(|| admin.username.clone())),
    );
    record.set_field("role", json!("ADMIN"));
    record.set_field("passwordHash", json!(hash_password(&admin.password)?));
    record.set_field(
        "companies",
        json!(
            admin
                .companies
                .iter()
                .map(|c| normalize_company_code(c))
                .collect::<Vec<_>>()
        ),
    );

    storage.create(record).await?;
    tracing::info!(username = %admin.username, "bootstrap admin user created");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdminUserConfig;

    fn config() -> BootstrapConfig {
        BootstrapConfig {
            admin_user: Some(AdminUserConfig {
                username: "admin".into(),
                password: "secret".into(),
                name: Some("Administrador".into()),
                companies: vec!["sede01".into()],
            }),
        }
    }

    #[tokio::test]
    async fn seeds_admin_once() {
        let storage = dispensario_db_memory::create_storage();
        seed(&config(), &storage).await.unwrap();
        seed(&config(), &storage).await.unwrap();

        let users = storage
            .search(RecordType::User, &ListParams::new())
            .await
            .unwrap();
        assert_eq!(users.total, 1);

        let admin = &users.records[0];
        assert_eq!(admin.str_field("username"), Some("admin"));
        assert_eq!(admin.str_field("role"), Some("ADMIN"));
        // Stored normalized and hashed
        assert_eq!(admin.field("companies").unwrap(), &json!(["SEDE01"]));
        assert!(
            admin
                .str_field("passwordHash")
                .unwrap()
                .starts_with("$argon2")
        );
    }

    #[tokio::test]
    async fn no_admin_configured_is_a_noop() {
        let storage = dispensario_db_memory::create_storage();
        seed(&BootstrapConfig::default(), &storage).await.unwrap();
        assert_eq!(storage.count(RecordType::User).await.unwrap(), 0);
    }
}
