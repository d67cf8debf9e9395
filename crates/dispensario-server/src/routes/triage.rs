//! Triage endpoints: the vital-sign assessment preceding an attention.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::Value;

use dispensario_api::{ApiError, ApiResponse, ListQuery, ListResponse};
use dispensario_auth::AuthContext;
use dispensario_core::{RecordEnvelope, RecordStatus, RecordType};
use dispensario_storage::{FieldFilter, RecordStorage};

use crate::routes::appointments::inherit_company;
use crate::routes::{
    base_list_params, ensure_patient, list_response, load_scoped, new_envelope, payload_object,
    replacement_envelope, resolve_company, scope_filter,
};
use crate::state::AppState;
use crate::validation;

#[derive(Debug, Default, Deserialize)]
pub struct TriageFilters {
    #[serde(rename = "patientId")]
    pub patient_id: Option<String>,
    pub urgency: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(query): Query<ListQuery>,
    Query(filters): Query<TriageFilters>,
) -> Result<ApiResponse<ListResponse<Value>>, ApiError> {
    let (mut params, page, limit) = base_list_params(&state, &query);
    params = params.with_filter(scope_filter(&ctx));
    if let Some(patient_id) = &filters.patient_id {
        params = params.with_filter(FieldFilter::Exact {
            field: "patientId".into(),
            value: patient_id.clone(),
        });
    }
    if let Some(urgency) = &filters.urgency {
        params = params.with_filter(FieldFilter::Exact {
            field: "urgency".into(),
            value: urgency.clone(),
        });
    }

    let result = state.storage.search(RecordType::Triage, &params).await?;
    Ok(ApiResponse::ok(list_response(result, page, limit)))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(body): Json<Value>,
) -> Result<ApiResponse<RecordEnvelope>, ApiError> {
    let mut payload = payload_object(body)?;
    validation::validate(RecordType::Triage, &payload)?;

    let patient_id = payload
        .get("patientId")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    let patient = ensure_patient(&state, &ctx, &patient_id).await?;

    inherit_company(&mut payload, &patient);
    resolve_company(&ctx, &mut payload)?;

    let created = state
        .storage
        .create(new_envelope(RecordType::Triage, payload))
        .await?;
    Ok(ApiResponse::created(created))
}

pub async fn read(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<ApiResponse<RecordEnvelope>, ApiError> {
    let record = load_scoped(&state, &ctx, RecordType::Triage, &id).await?;
    Ok(ApiResponse::ok(record))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<ApiResponse<RecordEnvelope>, ApiError> {
    let existing = load_scoped(&state, &ctx, RecordType::Triage, &id).await?;

    let mut payload = payload_object(body)?;
    validation::validate(RecordType::Triage, &payload)?;

    let patient_id = payload
        .get("patientId")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    let patient = ensure_patient(&state, &ctx, &patient_id).await?;

    inherit_company(&mut payload, &patient);
    resolve_company(&ctx, &mut payload)?;

    let updated = state
        .storage
        .update(
            RecordType::Triage,
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
    load_scoped(&state, &ctx, RecordType::Triage, &id).await?;
    state
        .storage
        .set_status(RecordType::Triage, &id, RecordStatus::Inactive)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
