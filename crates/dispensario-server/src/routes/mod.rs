//! Route handlers, one module per resource.

pub mod activities;
pub mod appointments;
pub mod attentions;
pub mod auth;
pub mod companies;
pub mod contraceptives;
pub mod patients;
pub mod reports;
pub mod triage;
pub mod users;

use serde_json::{Map, Value};

use dispensario_api::{ApiError, ListQuery, ListResponse};
use dispensario_auth::AuthContext;
use dispensario_core::{
    RecordEnvelope, RecordType, generate_id, normalize_company_code,
};
use dispensario_storage::{FieldFilter, ListParams, RecordStorage, SearchResult};

use crate::state::AppState;

/// Envelope header fields a payload may not smuggle in.
const RESERVED_FIELDS: [&str; 4] = ["id", "recordType", "status", "meta"];

/// Require a JSON object body.
pub(crate) fn payload_object(value: Value) -> Result<Map<String, Value>, ApiError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ApiError::bad_request("request body must be a JSON object")),
    }
}

/// Build a fresh envelope from a validated payload, stripping header fields.
pub(crate) fn new_envelope(record_type: RecordType, mut payload: Map<String, Value>) -> RecordEnvelope {
    for field in RESERVED_FIELDS {
        payload.remove(field);
    }
    RecordEnvelope::new(generate_id(), record_type).with_data(payload)
}

/// Build the replacement envelope for an update from a validated payload.
pub(crate) fn replacement_envelope(
    existing: &RecordEnvelope,
    mut payload: Map<String, Value>,
) -> RecordEnvelope {
    for field in RESERVED_FIELDS {
        payload.remove(field);
    }
    RecordEnvelope::new(existing.id.clone(), existing.record_type)
        .with_status(existing.status)
        .with_data(payload)
}

/// The company-scope filter for list queries.
pub(crate) fn scope_filter(ctx: &AuthContext) -> FieldFilter {
    FieldFilter::CompanyIn {
        companies: ctx.active_companies.clone(),
    }
}

/// Translate shared query parameters into storage list parameters.
pub(crate) fn base_list_params(state: &AppState, query: &ListQuery) -> (ListParams, u32, u32) {
    let settings = &state.config.search;
    let (offset, limit) = query.pagination(settings.default_count, settings.max_count);

    let mut params = ListParams::new().with_offset(offset).with_count(limit);
    if let Some(sort) = &query.sort {
        params = params.with_sort(sort.clone(), query.descending());
    }
    if let Some(estado) = &query.estado {
        params = params.with_filter(FieldFilter::Exact {
            field: "status".into(),
            value: estado.clone(),
        });
        if estado == "INACTIVO" {
            params = params.with_inactive();
        }
    }

    let page = query.page.unwrap_or(1).max(1);
    (params, page, limit)
}

/// Shape a storage page as the list response body.
pub(crate) fn list_response(result: SearchResult, page: u32, limit: u32) -> ListResponse<Value> {
    ListResponse {
        items: result
            .records
            .into_iter()
            .map(|r| serde_json::to_value(&r).unwrap_or(Value::Null))
            .collect(),
        total: result.total,
        page,
        limit,
    }
}

/// Read a record, mapping absence to 404 and enforcing the company scope.
pub(crate) async fn load_scoped(
    state: &AppState,
    ctx: &AuthContext,
    record_type: RecordType,
    id: &str,
) -> Result<RecordEnvelope, ApiError> {
    let record = state
        .storage
        .read(record_type, id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("{record_type}/{id}")))?;
    ensure_in_scope(ctx, &record)?;
    Ok(record)
}

/// Reject records whose company falls outside the request scope.
pub(crate) fn ensure_in_scope(ctx: &AuthContext, record: &RecordEnvelope) -> Result<(), ApiError> {
    if !record.record_type.is_company_scoped() {
        return Ok(());
    }
    match record.company() {
        Some(company) if !ctx.can_access(company) => Err(ApiError::forbidden(format!(
            "company '{company}' is outside the active scope"
        ))),
        _ => Ok(()),
    }
}

/// Fix the `company` field of a new record: normalize it, default it to the
/// single active company, and reject codes outside the scope.
pub(crate) fn resolve_company(
    ctx: &AuthContext,
    payload: &mut Map<String, Value>,
) -> Result<(), ApiError> {
    match payload.get("company").and_then(|v| v.as_str()) {
        Some(code) => {
            let code = normalize_company_code(code);
            if !ctx.can_access(&code) {
                return Err(ApiError::forbidden(format!(
                    "company '{code}' is outside the active scope"
                )));
            }
            payload.insert("company".into(), Value::String(code));
        }
        None => {
            let code = ctx.scope().first().cloned().ok_or_else(|| {
                ApiError::forbidden("user has no companies to operate on")
            })?;
            payload.insert("company".into(), Value::String(code));
        }
    }
    Ok(())
}

/// Resolve a referenced patient, rejecting dangling references with 422.
pub(crate) async fn ensure_patient(
    state: &AppState,
    ctx: &AuthContext,
    patient_id: &str,
) -> Result<RecordEnvelope, ApiError> {
    let patient = state
        .storage
        .read(RecordType::Patient, patient_id)
        .await
        .map_err(|e| match e {
            dispensario_storage::StorageError::Gone { .. } => {
                ApiError::unprocessable(format!("patient '{patient_id}' was removed"))
            }
            other => other.into(),
        })?
        .ok_or_else(|| ApiError::unprocessable(format!("patient '{patient_id}' does not exist")))?;
    ensure_in_scope(ctx, &patient)?;
    Ok(patient)
}

/// Display name of a user record, for signatures and report columns.
pub(crate) async fn user_display_name(state: &AppState, user_id: &str) -> String {
    match state
        .storage
        .read(RecordType::User, user_id)
        .await
        .ok()
        .flatten()
    {
        Some(user) => user
            .str_field("name")
            .or(user.str_field("username"))
            .unwrap_or(user_id)
            .to_string(),
        None => user_id.to_string(),
    }
}
