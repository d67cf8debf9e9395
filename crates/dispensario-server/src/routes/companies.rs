//! Company (sede) endpoints. Every authenticated user can read them; writes
//! are admin-only.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde_json::{Value, json};

use dispensario_api::{ApiError, ApiResponse, ListQuery, ListResponse};
use dispensario_auth::AuthContext;
use dispensario_core::{
    RecordEnvelope, RecordStatus, RecordType, normalize_company_code, warehouse_for_branch,
};
use dispensario_storage::{FieldFilter, ListParams, RecordStorage};

use crate::routes::{base_list_params, list_response, new_envelope, payload_object, replacement_envelope};
use crate::state::AppState;
use crate::validation;

fn require_admin(ctx: &AuthContext) -> Result<(), ApiError> {
    if ctx.is_admin() {
        Ok(())
    } else {
        Err(ApiError::forbidden("administrator role required"))
    }
}

/// Normalize the company codes and fill the warehouse from the branch when
/// none is declared.
fn normalize_codes(payload: &mut serde_json::Map<String, Value>) {
    for field in ["code", "branchCode", "warehouseCode"] {
        if let Some(value) = payload.get(field).and_then(|v| v.as_str()) {
            payload.insert(field.into(), json!(normalize_company_code(value)));
        }
    }
    if !payload.contains_key("warehouseCode")
        && let Some(branch) = payload.get("branchCode").and_then(|v| v.as_str())
    {
        payload.insert("warehouseCode".into(), json!(warehouse_for_branch(branch)));
    }
}

async fn code_taken(
    state: &AppState,
    code: &str,
    exclude_id: Option<&str>,
) -> Result<bool, ApiError> {
    let result = state
        .storage
        .search(
            RecordType::Company,
            &ListParams::new()
                .with_filter(FieldFilter::Exact {
                    field: "code".into(),
                    value: code.into(),
                })
                .with_inactive(),
        )
        .await?;
    Ok(result
        .records
        .iter()
        .any(|r| Some(r.id.as_str()) != exclude_id))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(_ctx): Extension<AuthContext>,
    Query(query): Query<ListQuery>,
) -> Result<ApiResponse<ListResponse<Value>>, ApiError> {
    let (mut params, page, limit) = base_list_params(&state, &query);
    if let Some(q) = &query.q {
        params = params.with_filter(FieldFilter::Contains {
            field: "name".into(),
            value: q.clone(),
        });
    }
    let result = state.storage.search(RecordType::Company, &params).await?;
    Ok(ApiResponse::ok(list_response(result, page, limit)))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(body): Json<Value>,
) -> Result<ApiResponse<RecordEnvelope>, ApiError> {
    require_admin(&ctx)?;

    let mut payload = payload_object(body)?;
    validation::validate(RecordType::Company, &payload)?;
    normalize_codes(&mut payload);

    let code = payload
        .get("code")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    if code_taken(&state, &code, None).await? {
        return Err(ApiError::conflict(format!(
            "company code '{code}' already exists"
        )));
    }

    let created = state
        .storage
        .create(new_envelope(RecordType::Company, payload))
        .await?;
    tracing::info!(company = %created.id, code = %code, "company created");
    Ok(ApiResponse::created(created))
}

pub async fn read(
    State(state): State<AppState>,
    Extension(_ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<ApiResponse<RecordEnvelope>, ApiError> {
    let record = state
        .storage
        .read(RecordType::Company, &id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Company/{id}")))?;
    Ok(ApiResponse::ok(record))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<ApiResponse<RecordEnvelope>, ApiError> {
    require_admin(&ctx)?;

    let existing = state
        .storage
        .read(RecordType::Company, &id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Company/{id}")))?;

    let mut payload = payload_object(body)?;
    validation::validate(RecordType::Company, &payload)?;
    normalize_codes(&mut payload);

    let code = payload
        .get("code")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    if code_taken(&state, &code, Some(&id)).await? {
        return Err(ApiError::conflict(format!(
            "company code '{code}' already exists"
        )));
    }

    let updated = state
        .storage
        .update(
            RecordType::Company,
            &id,
            replacement_envelope(&existing, payload),
        )
        .await?;
    Ok(ApiResponse::ok(updated))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    require_admin(&ctx)?;
    state
        .storage
        .read(RecordType::Company, &id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Company/{id}")))?;
    state
        .storage
        .set_status(RecordType::Company, &id, RecordStatus::Inactive)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_fills_warehouse_from_branch() {
        let mut payload = json!({"code": "sede01", "name": "Sede", "branchCode": "suc01"})
            .as_object()
            .unwrap()
            .clone();
        normalize_codes(&mut payload);
        assert_eq!(payload["code"], "SEDE01");
        assert_eq!(payload["branchCode"], "SUC01");
        assert_eq!(payload["warehouseCode"], "ALM-SUC01");
    }

    #[test]
    fn normalize_keeps_explicit_warehouse() {
        let mut payload = json!({
            "code": "SEDE01",
            "name": "Sede",
            "branchCode": "SUC01",
            "warehouseCode": "alm-especial"
        })
        .as_object()
        .unwrap()
        .clone();
        normalize_codes(&mut payload);
        assert_eq!(payload["warehouseCode"], "ALM-ESPECIAL");
    }
}
