//! User administration endpoints. Writes are admin-only; a user may read
//! their own record.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde_json::{Value, json};

use dispensario_api::{ApiError, ApiResponse, ListQuery, ListResponse};
use dispensario_auth::{AuthContext, hash_password};
use dispensario_core::{RecordEnvelope, RecordStatus, RecordType, normalize_company_code};
use dispensario_storage::{FieldFilter, ListParams, RecordStorage};

use crate::routes::{base_list_params, new_envelope, payload_object, replacement_envelope};
use crate::state::AppState;
use crate::validation;

/// Serialize a user without its credential material.
pub(crate) fn user_json(record: &RecordEnvelope) -> Value {
    let mut value = serde_json::to_value(record).unwrap_or(Value::Null);
    if let Some(obj) = value.as_object_mut() {
        obj.remove("passwordHash");
    }
    value
}

fn require_admin(ctx: &AuthContext) -> Result<(), ApiError> {
    if ctx.is_admin() {
        Ok(())
    } else {
        Err(ApiError::forbidden("administrator role required"))
    }
}

async fn username_taken(
    state: &AppState,
    username: &str,
    exclude_id: Option<&str>,
) -> Result<bool, ApiError> {
    let result = state
        .storage
        .search(
            RecordType::User,
            &ListParams::new()
                .with_filter(FieldFilter::Exact {
                    field: "username".into(),
                    value: username.into(),
                })
                .with_inactive(),
        )
        .await?;
    Ok(result
        .records
        .iter()
        .any(|r| Some(r.id.as_str()) != exclude_id))
}

fn normalize_companies(payload: &mut serde_json::Map<String, Value>) {
    if let Some(companies) = payload.get("companies").and_then(|v| v.as_array()) {
        let normalized: Vec<Value> = companies
            .iter()
            .filter_map(|v| v.as_str())
            .map(|c| json!(normalize_company_code(c)))
            .collect();
        payload.insert("companies".into(), Value::Array(normalized));
    }
}

pub async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(query): Query<ListQuery>,
) -> Result<ApiResponse<ListResponse<Value>>, ApiError> {
    require_admin(&ctx)?;

    let (mut params, page, limit) = base_list_params(&state, &query);
    if let Some(q) = &query.q {
        params = params.with_filter(FieldFilter::Contains {
            field: "username".into(),
            value: q.clone(),
        });
    }

    let result = state.storage.search(RecordType::User, &params).await?;
    let body = ListResponse {
        total: result.total,
        items: result.records.iter().map(user_json).collect(),
        page,
        limit,
    };
    Ok(ApiResponse::ok(body))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(body): Json<Value>,
) -> Result<ApiResponse<Value>, ApiError> {
    require_admin(&ctx)?;

    let mut payload = payload_object(body)?;
    validation::validate(RecordType::User, &payload)?;

    let password = payload
        .remove("password")
        .and_then(|v| v.as_str().map(str::to_string))
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::unprocessable("field 'password' is required"))?;

    let username = payload
        .get("username")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    if username_taken(&state, &username, None).await? {
        return Err(ApiError::conflict(format!(
            "username '{username}' is already taken"
        )));
    }

    normalize_companies(&mut payload);
    payload.insert(
        "passwordHash".into(),
        json!(hash_password(&password).map_err(|e| ApiError::internal(e.to_string()))?),
    );

    let created = state
        .storage
        .create(new_envelope(RecordType::User, payload))
        .await?;
    tracing::info!(user = %created.id, username = %username, "user created");
    Ok(ApiResponse::created(user_json(&created)))
}

pub async fn read(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<ApiResponse<Value>, ApiError> {
    if !ctx.is_admin() && ctx.user_id != id {
        return Err(ApiError::forbidden("administrator role required"));
    }
    let record = state
        .storage
        .read(RecordType::User, &id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("User/{id}")))?;
    Ok(ApiResponse::ok(user_json(&record)))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<ApiResponse<Value>, ApiError> {
    require_admin(&ctx)?;

    let existing = state
        .storage
        .read(RecordType::User, &id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("User/{id}")))?;

    let mut payload = payload_object(body)?;
    validation::validate(RecordType::User, &payload)?;

    let username = payload
        .get("username")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    if username_taken(&state, &username, Some(&id)).await? {
        return Err(ApiError::conflict(format!(
            "username '{username}' is already taken"
        )));
    }

    normalize_companies(&mut payload);

    // Password changes ride on the same PUT; otherwise keep the stored hash
    match payload
        .remove("password")
        .and_then(|v| v.as_str().map(str::to_string))
        .filter(|p| !p.is_empty())
    {
        Some(password) => {
            payload.insert(
                "passwordHash".into(),
                json!(hash_password(&password).map_err(|e| ApiError::internal(e.to_string()))?),
            );
        }
        None => {
            if let Some(hash) = existing.field("passwordHash") {
                payload.insert("passwordHash".into(), hash.clone());
            }
        }
    }

    let updated = state
        .storage
        .update(RecordType::User, &id, replacement_envelope(&existing, payload))
        .await?;
    Ok(ApiResponse::ok(user_json(&updated)))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    require_admin(&ctx)?;
    state
        .storage
        .read(RecordType::User, &id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("User/{id}")))?;
    state
        .storage
        .set_status(RecordType::User, &id, RecordStatus::Inactive)
        .await?;
    tracing::info!(user = %id, "user deactivated");
    Ok(StatusCode::NO_CONTENT)
}
