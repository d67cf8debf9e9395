//! Activity log endpoints (campaigns, talks, outreach).

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde_json::{Value, json};

use dispensario_api::{ApiError, ApiResponse, ListQuery, ListResponse};
use dispensario_auth::AuthContext;
use dispensario_core::{RecordEnvelope, RecordType};
use dispensario_storage::{FieldFilter, RecordStorage};

use crate::routes::attentions::parse_date_param;
use crate::routes::{
    base_list_params, list_response, load_scoped, new_envelope, payload_object,
    replacement_envelope, resolve_company, scope_filter,
};
use crate::state::AppState;
use crate::validation;

pub async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(query): Query<ListQuery>,
) -> Result<ApiResponse<ListResponse<Value>>, ApiError> {
    let (mut params, page, limit) = base_list_params(&state, &query);
    params = params.with_filter(scope_filter(&ctx));
    if let Some(q) = &query.q {
        params = params.with_filter(FieldFilter::Contains {
            field: "description".into(),
            value: q.clone(),
        });
    }
    if query.from.is_some() || query.to.is_some() {
        params = params.with_filter(FieldFilter::DateRange {
            field: "date".into(),
            from: parse_date_param(query.from.as_deref())?,
            to: parse_date_param(query.to.as_deref())?,
        });
    }

    let result = state.storage.search(RecordType::Activity, &params).await?;
    Ok(ApiResponse::ok(list_response(result, page, limit)))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(body): Json<Value>,
) -> Result<ApiResponse<RecordEnvelope>, ApiError> {
    let mut payload = payload_object(body)?;
    validation::validate(RecordType::Activity, &payload)?;
    resolve_company(&ctx, &mut payload)?;
    payload
        .entry("responsibleId".to_string())
        .or_insert(json!(ctx.user_id));

    let created = state
        .storage
        .create(new_envelope(RecordType::Activity, payload))
        .await?;
    Ok(ApiResponse::created(created))
}

pub async fn read(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<ApiResponse<RecordEnvelope>, ApiError> {
    let record = load_scoped(&state, &ctx, RecordType::Activity, &id).await?;
    Ok(ApiResponse::ok(record))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<ApiResponse<RecordEnvelope>, ApiError> {
    let existing = load_scoped(&state, &ctx, RecordType::Activity, &id).await?;

    let mut payload = payload_object(body)?;
    validation::validate(RecordType::Activity, &payload)?;
    resolve_company(&ctx, &mut payload)?;

    let updated = state
        .storage
        .update(
            RecordType::Activity,
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
    load_scoped(&state, &ctx, RecordType::Activity, &id).await?;
    state.storage.delete(RecordType::Activity, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
