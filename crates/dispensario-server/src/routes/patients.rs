//! Patient record endpoints.
//!
//! Responses carry a computed `age` field next to the stored birth date;
//! clients never derive it themselves.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde_json::{Value, json};
use std::str::FromStr;

use dispensario_api::{ApiError, ApiResponse, ListQuery, ListResponse};
use dispensario_auth::AuthContext;
use dispensario_core::{PlainDate, RecordEnvelope, RecordStatus, RecordType, age_on, now_utc};
use dispensario_storage::{FieldFilter, RecordStorage};

use crate::routes::{
    base_list_params, load_scoped, new_envelope, payload_object, replacement_envelope,
    resolve_company, scope_filter,
};
use crate::state::AppState;
use crate::validation;

/// Serialize a patient with its computed age.
pub(crate) fn patient_json(record: &RecordEnvelope) -> Value {
    let mut value = serde_json::to_value(record).unwrap_or(Value::Null);
    if let Some(birth) = record
        .str_field("birthDate")
        .and_then(|s| PlainDate::from_str(s).ok())
        && let Some(obj) = value.as_object_mut()
    {
        obj.insert("age".into(), json!(age_on(birth, now_utc().date())));
    }
    value
}

/// Maintain the denormalized column the free-text search runs over.
fn index_search_text(payload: &mut serde_json::Map<String, Value>) {
    let text = ["documentNumber", "givenNames", "familyNames"]
        .iter()
        .filter_map(|f| payload.get(*f).and_then(|v| v.as_str()))
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    payload.insert("searchText".into(), Value::String(text));
}

pub async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(query): Query<ListQuery>,
) -> Result<ApiResponse<ListResponse<Value>>, ApiError> {
    let (mut params, page, limit) = base_list_params(&state, &query);
    params = params.with_filter(scope_filter(&ctx));
    if let Some(q) = &query.q {
        params = params.with_filter(FieldFilter::Contains {
            field: "searchText".into(),
            value: q.to_lowercase(),
        });
    }

    let result = state.storage.search(RecordType::Patient, &params).await?;
    let body = ListResponse {
        total: result.total,
        items: result.records.iter().map(patient_json).collect(),
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
    let mut payload = payload_object(body)?;
    validation::validate(RecordType::Patient, &payload)?;
    resolve_company(&ctx, &mut payload)?;
    index_search_text(&mut payload);

    let created = state
        .storage
        .create(new_envelope(RecordType::Patient, payload))
        .await?;
    tracing::info!(patient = %created.id, "patient created");
    Ok(ApiResponse::created(patient_json(&created)))
}

pub async fn read(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<ApiResponse<Value>, ApiError> {
    let record = load_scoped(&state, &ctx, RecordType::Patient, &id).await?;
    Ok(ApiResponse::ok(patient_json(&record)))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<ApiResponse<Value>, ApiError> {
    let existing = load_scoped(&state, &ctx, RecordType::Patient, &id).await?;

    let mut payload = payload_object(body)?;
    validation::validate(RecordType::Patient, &payload)?;
    resolve_company(&ctx, &mut payload)?;
    index_search_text(&mut payload);

    let updated = state
        .storage
        .update(
            RecordType::Patient,
            &id,
            replacement_envelope(&existing, payload),
        )
        .await?;
    Ok(ApiResponse::ok(patient_json(&updated)))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    load_scoped(&state, &ctx, RecordType::Patient, &id).await?;
    state
        .storage
        .set_status(RecordType::Patient, &id, RecordStatus::Inactive)
        .await?;
    tracing::info!(patient = %id, "patient deactivated");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn patient_json_adds_age() {
        let mut record = RecordEnvelope::new("p-1".into(), RecordType::Patient);
        record.set_field("birthDate", json!("1990-01-01"));

        let value = patient_json(&record);
        assert!(value["age"].is_u64());
        assert!(value["age"].as_u64().unwrap() >= 34);
    }

    #[test]
    fn patient_json_without_birth_date_has_no_age() {
        let record = RecordEnvelope::new("p-1".into(), RecordType::Patient);
        let value = patient_json(&record);
        assert!(value.get("age").is_none());
    }

    #[test]
    fn search_text_concatenates_identity_fields() {
        let mut payload = json!({
            "documentNumber": "44556677",
            "givenNames": "Rosa",
            "familyNames": "Vargas"
        })
        .as_object()
        .unwrap()
        .clone();
        index_search_text(&mut payload);
        assert_eq!(
            payload.get("searchText").unwrap(),
            &json!("44556677 rosa vargas")
        );
    }
}
