//! Appointment scheduling endpoints.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};

use dispensario_api::{ApiError, ApiResponse, ListQuery, ListResponse};
use dispensario_auth::AuthContext;
use dispensario_core::{RecordEnvelope, RecordType};
use dispensario_storage::{FieldFilter, RecordStorage};

use crate::routes::{
    base_list_params, ensure_patient, list_response, load_scoped, new_envelope, payload_object,
    replacement_envelope, resolve_company, scope_filter,
};
use crate::state::AppState;
use crate::validation;

#[derive(Debug, Default, Deserialize)]
pub struct AppointmentFilters {
    #[serde(rename = "patientId")]
    pub patient_id: Option<String>,
    pub date: Option<String>,
    pub state: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(query): Query<ListQuery>,
    Query(filters): Query<AppointmentFilters>,
) -> Result<ApiResponse<ListResponse<Value>>, ApiError> {
    let (mut params, page, limit) = base_list_params(&state, &query);
    params = params.with_filter(scope_filter(&ctx));
    if let Some(patient_id) = &filters.patient_id {
        params = params.with_filter(FieldFilter::Exact {
            field: "patientId".into(),
            value: patient_id.clone(),
        });
    }
    if let Some(date) = &filters.date {
        params = params.with_filter(FieldFilter::Exact {
            field: "date".into(),
            value: date.clone(),
        });
    }
    if let Some(st) = &filters.state {
        params = params.with_filter(FieldFilter::Exact {
            field: "state".into(),
            value: st.clone(),
        });
    }

    let result = state
        .storage
        .search(RecordType::Appointment, &params)
        .await?;
    Ok(ApiResponse::ok(list_response(result, page, limit)))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(body): Json<Value>,
) -> Result<ApiResponse<RecordEnvelope>, ApiError> {
    let mut payload = payload_object(body)?;
    validation::validate(RecordType::Appointment, &payload)?;

    let patient_id = payload
        .get("patientId")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    let patient = ensure_patient(&state, &ctx, &patient_id).await?;

    inherit_company(&mut payload, &patient);
    resolve_company(&ctx, &mut payload)?;
    payload
        .entry("state".to_string())
        .or_insert(json!("PENDIENTE"));

    let created = state
        .storage
        .create(new_envelope(RecordType::Appointment, payload))
        .await?;
    Ok(ApiResponse::created(created))
}

pub async fn read(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<ApiResponse<RecordEnvelope>, ApiError> {
    let record = load_scoped(&state, &ctx, RecordType::Appointment, &id).await?;
    Ok(ApiResponse::ok(record))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<ApiResponse<RecordEnvelope>, ApiError> {
    let existing = load_scoped(&state, &ctx, RecordType::Appointment, &id).await?;

    let mut payload = payload_object(body)?;
    validation::validate(RecordType::Appointment, &payload)?;

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
            RecordType::Appointment,
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
    load_scoped(&state, &ctx, RecordType::Appointment, &id).await?;
    state.storage.delete(RecordType::Appointment, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// New rows default to the patient's company when the payload names none.
pub(crate) fn inherit_company(
    payload: &mut serde_json::Map<String, Value>,
    patient: &RecordEnvelope,
) {
    if !payload.contains_key("company")
        && let Some(company) = patient.company()
    {
        payload.insert("company".into(), json!(company));
    }
}
