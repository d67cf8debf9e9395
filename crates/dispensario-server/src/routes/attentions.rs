//! Attention (clinical encounter) endpoints, with the nested diagnosis,
//! procedure and prescription resources and the printable documents.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Html,
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::str::FromStr;

use dispensario_api::{ApiError, ApiResponse, ListQuery, ListResponse};
use dispensario_auth::AuthContext;
use dispensario_core::{
    PlainDate, RecordEnvelope, RecordStatus, RecordType, age_on, normalize_company_code, now_utc,
    warehouse_for_branch,
};
use dispensario_reports::{
    MedicalCertificate, PrescriptionItem, PrescriptionSheet,
};
use dispensario_storage::{FieldFilter, ListParams, RecordStorage};

use crate::routes::appointments::inherit_company;
use crate::routes::{
    base_list_params, ensure_patient, list_response, load_scoped, new_envelope, payload_object,
    replacement_envelope, resolve_company, scope_filter, user_display_name,
};
use crate::state::AppState;
use crate::validation;

#[derive(Debug, Default, Deserialize)]
pub struct AttentionFilters {
    #[serde(rename = "patientId")]
    pub patient_id: Option<String>,
}

/// Allowed lifecycle transitions of an attention. FINALIZADO is terminal; a
/// suspended attention must be reactivated before it can finish.
fn check_transition(from: RecordStatus, to: RecordStatus) -> Result<(), ApiError> {
    use RecordStatus::*;
    let allowed = matches!(
        (from, to),
        (Active, Suspended) | (Active, Finished) | (Suspended, Active)
    ) || from == to;
    if !allowed {
        return Err(ApiError::unprocessable(format!(
            "attention cannot change from {from} to {to}"
        )));
    }
    Ok(())
}

pub async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(query): Query<ListQuery>,
    Query(filters): Query<AttentionFilters>,
) -> Result<ApiResponse<ListResponse<Value>>, ApiError> {
    let (mut params, page, limit) = base_list_params(&state, &query);
    params = params.with_filter(scope_filter(&ctx));
    if let Some(patient_id) = &filters.patient_id {
        params = params.with_filter(FieldFilter::Exact {
            field: "patientId".into(),
            value: patient_id.clone(),
        });
    }
    if query.from.is_some() || query.to.is_some() {
        params = params.with_filter(FieldFilter::DateRange {
            field: "date".into(),
            from: parse_date_param(query.from.as_deref())?,
            to: parse_date_param(query.to.as_deref())?,
        });
    }

    let result = state.storage.search(RecordType::Attention, &params).await?;
    Ok(ApiResponse::ok(list_response(result, page, limit)))
}

pub(crate) fn parse_date_param(value: Option<&str>) -> Result<Option<PlainDate>, ApiError> {
    value
        .map(|s| {
            PlainDate::from_str(s)
                .map_err(|_| ApiError::bad_request(format!("invalid date parameter '{s}'")))
        })
        .transpose()
}

pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(body): Json<Value>,
) -> Result<ApiResponse<RecordEnvelope>, ApiError> {
    let mut payload = payload_object(body)?;
    validation::validate(RecordType::Attention, &payload)?;

    let patient_id = payload
        .get("patientId")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    let patient = ensure_patient(&state, &ctx, &patient_id).await?;

    inherit_company(&mut payload, &patient);
    resolve_company(&ctx, &mut payload)?;
    // The attending defaults to whoever opens the encounter
    payload
        .entry("attendingId".to_string())
        .or_insert(json!(ctx.user_id));

    let created = state
        .storage
        .create(new_envelope(RecordType::Attention, payload))
        .await?;
    tracing::info!(attention = %created.id, patient = %patient_id, "attention opened");
    Ok(ApiResponse::created(created))
}

pub async fn read(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<ApiResponse<RecordEnvelope>, ApiError> {
    let record = load_scoped(&state, &ctx, RecordType::Attention, &id).await?;
    Ok(ApiResponse::ok(record))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<ApiResponse<RecordEnvelope>, ApiError> {
    let existing = load_scoped(&state, &ctx, RecordType::Attention, &id).await?;

    let mut payload = payload_object(body)?;
    validation::validate(RecordType::Attention, &payload)?;

    // Lifecycle change rides on the same PUT
    let requested_status = match payload.get("status").and_then(|v| v.as_str()) {
        Some(value) => {
            let status = RecordStatus::from_str(value)
                .map_err(|_| ApiError::unprocessable(format!("unknown status '{value}'")))?;
            check_transition(existing.status, status)?;
            status
        }
        None => existing.status,
    };

    let patient_id = payload
        .get("patientId")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    let patient = ensure_patient(&state, &ctx, &patient_id).await?;

    inherit_company(&mut payload, &patient);
    resolve_company(&ctx, &mut payload)?;

    let replacement = replacement_envelope(&existing, payload).with_status(requested_status);
    let updated = state
        .storage
        .update(RecordType::Attention, &id, replacement)
        .await?;
    Ok(ApiResponse::ok(updated))
}

/// DELETE suspends: clinical encounters are never physically removed.
pub async fn delete(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let existing = load_scoped(&state, &ctx, RecordType::Attention, &id).await?;
    check_transition(existing.status, RecordStatus::Suspended)?;
    state
        .storage
        .set_status(RecordType::Attention, &id, RecordStatus::Suspended)
        .await?;
    tracing::info!(attention = %id, "attention suspended");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Diagnoses
// ---------------------------------------------------------------------------

pub async fn list_diagnoses(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(attention_id): Path<String>,
) -> Result<ApiResponse<ListResponse<Value>>, ApiError> {
    load_scoped(&state, &ctx, RecordType::Attention, &attention_id).await?;
    let result = state
        .storage
        .search(RecordType::Diagnosis, &children_of("attentionId", &attention_id))
        .await?;
    let total = result.total;
    Ok(ApiResponse::ok(list_response(result, 1, total as u32)))
}

pub async fn create_diagnosis(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(attention_id): Path<String>,
    Json(body): Json<Value>,
) -> Result<ApiResponse<RecordEnvelope>, ApiError> {
    let attention = load_scoped(&state, &ctx, RecordType::Attention, &attention_id).await?;
    if attention.status == RecordStatus::Finished {
        return Err(ApiError::unprocessable(
            "cannot add a diagnosis to a finalized attention",
        ));
    }

    let mut payload = payload_object(body)?;
    validation::validate(RecordType::Diagnosis, &payload)?;
    payload.insert("attentionId".into(), json!(attention.id));
    if let Some(company) = attention.company() {
        payload.insert("company".into(), json!(company));
    }
    payload
        .entry("kind".to_string())
        .or_insert(json!("PRESUNTIVO"));

    let created = state
        .storage
        .create(new_envelope(RecordType::Diagnosis, payload))
        .await?;
    Ok(ApiResponse::created(created))
}

pub async fn update_diagnosis(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<ApiResponse<RecordEnvelope>, ApiError> {
    let existing = load_scoped(&state, &ctx, RecordType::Diagnosis, &id).await?;

    let mut payload = payload_object(body)?;
    validation::validate(RecordType::Diagnosis, &payload)?;
    // The parent link and company are fixed at creation
    payload.insert("attentionId".into(), existing.field("attentionId").cloned().unwrap_or(Value::Null));
    if let Some(company) = existing.company() {
        payload.insert("company".into(), json!(company));
    }

    let updated = state
        .storage
        .update(
            RecordType::Diagnosis,
            &id,
            replacement_envelope(&existing, payload),
        )
        .await?;
    Ok(ApiResponse::ok(updated))
}

pub async fn delete_diagnosis(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    load_scoped(&state, &ctx, RecordType::Diagnosis, &id).await?;

    // Procedures hang off the diagnosis; remove them with it
    let procedures = state
        .storage
        .search(RecordType::Procedure, &children_of("diagnosisId", &id))
        .await?;
    for procedure in procedures.records {
        state
            .storage
            .delete(RecordType::Procedure, &procedure.id)
            .await?;
    }

    state.storage.delete(RecordType::Diagnosis, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Procedures
// ---------------------------------------------------------------------------

pub async fn list_procedures(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(diagnosis_id): Path<String>,
) -> Result<ApiResponse<ListResponse<Value>>, ApiError> {
    load_scoped(&state, &ctx, RecordType::Diagnosis, &diagnosis_id).await?;
    let result = state
        .storage
        .search(RecordType::Procedure, &children_of("diagnosisId", &diagnosis_id))
        .await?;
    let total = result.total;
    Ok(ApiResponse::ok(list_response(result, 1, total as u32)))
}

pub async fn create_procedure(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(diagnosis_id): Path<String>,
    Json(body): Json<Value>,
) -> Result<ApiResponse<RecordEnvelope>, ApiError> {
    let diagnosis = load_scoped(&state, &ctx, RecordType::Diagnosis, &diagnosis_id).await?;

    let mut payload = payload_object(body)?;
    validation::validate(RecordType::Procedure, &payload)?;
    payload.insert("diagnosisId".into(), json!(diagnosis.id));
    if let Some(company) = diagnosis.company() {
        payload.insert("company".into(), json!(company));
    }

    let created = state
        .storage
        .create(new_envelope(RecordType::Procedure, payload))
        .await?;
    Ok(ApiResponse::created(created))
}

pub async fn delete_procedure(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    load_scoped(&state, &ctx, RecordType::Procedure, &id).await?;
    state.storage.delete(RecordType::Procedure, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Prescriptions
// ---------------------------------------------------------------------------

pub async fn list_prescriptions(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(attention_id): Path<String>,
) -> Result<ApiResponse<ListResponse<Value>>, ApiError> {
    load_scoped(&state, &ctx, RecordType::Attention, &attention_id).await?;
    let result = state
        .storage
        .search(
            RecordType::Prescription,
            &children_of("attentionId", &attention_id),
        )
        .await?;
    let total = result.total;
    Ok(ApiResponse::ok(list_response(result, 1, total as u32)))
}

pub async fn create_prescription(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(attention_id): Path<String>,
    Json(body): Json<Value>,
) -> Result<ApiResponse<RecordEnvelope>, ApiError> {
    let attention = load_scoped(&state, &ctx, RecordType::Attention, &attention_id).await?;
    if attention.status != RecordStatus::Active {
        return Err(ApiError::unprocessable(
            "prescriptions can only be added to an active attention",
        ));
    }

    let mut payload = payload_object(body)?;
    validation::validate(RecordType::Prescription, &payload)?;
    payload.insert("attentionId".into(), json!(attention.id));
    if let Some(company) = attention.company() {
        payload.insert("company".into(), json!(company));
        payload.insert(
            "warehouseCode".into(),
            json!(dispensing_warehouse(&state, company).await),
        );
    }

    let created = state
        .storage
        .create(new_envelope(RecordType::Prescription, payload))
        .await?;
    Ok(ApiResponse::created(created))
}

pub async fn delete_prescription(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    load_scoped(&state, &ctx, RecordType::Prescription, &id).await?;
    state.storage.delete(RecordType::Prescription, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// The warehouse dispensing for a company: the company row's explicit
/// `warehouseCode`, or the code derived from its branch.
pub(crate) async fn dispensing_warehouse(state: &AppState, company_code: &str) -> String {
    let company = state
        .storage
        .search(
            RecordType::Company,
            &ListParams::new().with_filter(FieldFilter::Exact {
                field: "code".into(),
                value: normalize_company_code(company_code),
            }),
        )
        .await
        .ok()
        .and_then(|r| r.records.into_iter().next());

    match company {
        Some(company) => match company.str_field("warehouseCode") {
            Some(code) => code.to_string(),
            None => warehouse_for_branch(company.str_field("branchCode").unwrap_or(company_code)),
        },
        None => warehouse_for_branch(company_code),
    }
}

// ---------------------------------------------------------------------------
// Printable documents
// ---------------------------------------------------------------------------

pub async fn certificate(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(attention_id): Path<String>,
) -> Result<Html<String>, ApiError> {
    let attention = load_scoped(&state, &ctx, RecordType::Attention, &attention_id).await?;
    let patient = read_patient_lenient(&state, attention.str_field("patientId")).await;

    let diagnoses = state
        .storage
        .search(RecordType::Diagnosis, &children_of("attentionId", &attention_id))
        .await?
        .records
        .into_iter()
        .map(|d| {
            format!(
                "{} {}",
                d.str_field("cie10Code").unwrap_or_default(),
                d.str_field("description").unwrap_or_default()
            )
            .trim()
            .to_string()
        })
        .collect();

    let attending = user_display_name(
        &state,
        attention.str_field("attendingId").unwrap_or_default(),
    )
    .await;

    let (patient_name, patient_document, patient_age) = patient_identity(patient.as_ref());
    let certificate = MedicalCertificate {
        patient_name,
        patient_document,
        patient_age,
        attention_date: attention.str_field("date").unwrap_or_default().to_string(),
        diagnoses,
        rest_days: attention
            .field("restDays")
            .and_then(|v| v.as_u64())
            .map(|d| d as u32),
        attending,
        company: attention.company().unwrap_or_default().to_string(),
    };

    Ok(Html(certificate.render()))
}

pub async fn prescription_sheet(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(attention_id): Path<String>,
) -> Result<Html<String>, ApiError> {
    let attention = load_scoped(&state, &ctx, RecordType::Attention, &attention_id).await?;
    let patient = read_patient_lenient(&state, attention.str_field("patientId")).await;

    let prescriptions = state
        .storage
        .search(
            RecordType::Prescription,
            &children_of("attentionId", &attention_id),
        )
        .await?;

    let items = prescriptions
        .records
        .iter()
        .map(|p| PrescriptionItem {
            medication: p.str_field("medication").unwrap_or_default().to_string(),
            dose: p.str_field("dose").unwrap_or_default().to_string(),
            frequency: p.str_field("frequency").unwrap_or_default().to_string(),
            duration: p.str_field("duration").unwrap_or_default().to_string(),
        })
        .collect();

    let warehouse_code = match prescriptions
        .records
        .iter()
        .find_map(|p| p.str_field("warehouseCode"))
    {
        Some(code) => code.to_string(),
        None => dispensing_warehouse(&state, attention.company().unwrap_or_default()).await,
    };

    let attending = user_display_name(
        &state,
        attention.str_field("attendingId").unwrap_or_default(),
    )
    .await;

    let (patient_name, patient_document, _) = patient_identity(patient.as_ref());
    let sheet = PrescriptionSheet {
        patient_name,
        patient_document,
        date: attention.str_field("date").unwrap_or_default().to_string(),
        warehouse_code,
        items,
        attending,
        company: attention.company().unwrap_or_default().to_string(),
    };

    Ok(Html(sheet.render()))
}

/// Reports and printables tolerate removed patients: the historic document
/// still renders, with the reference shown as-is.
pub(crate) async fn read_patient_lenient(
    state: &AppState,
    patient_id: Option<&str>,
) -> Option<RecordEnvelope> {
    let id = patient_id?;
    state.storage.read(RecordType::Patient, id).await.ok()?
}

pub(crate) fn patient_identity(
    patient: Option<&RecordEnvelope>,
) -> (String, String, Option<u32>) {
    match patient {
        Some(p) => {
            let name = format!(
                "{} {}",
                p.str_field("givenNames").unwrap_or_default(),
                p.str_field("familyNames").unwrap_or_default()
            )
            .trim()
            .to_string();
            let document = p.str_field("documentNumber").unwrap_or_default().to_string();
            let age = p
                .str_field("birthDate")
                .and_then(|s| PlainDate::from_str(s).ok())
                .map(|birth| age_on(birth, now_utc().date()));
            (name, document, age)
        }
        None => ("(paciente no disponible)".to_string(), String::new(), None),
    }
}

/// List parameters selecting the children of a parent record, unpaginated.
pub(crate) fn children_of(link_field: &str, parent_id: &str) -> ListParams {
    ListParams::new()
        .with_filter(FieldFilter::Exact {
            field: link_field.into(),
            value: parent_id.into(),
        })
        .with_sort("createdAt", false)
}
