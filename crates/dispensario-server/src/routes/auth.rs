//! Login and token renewal.

use axum::{Extension, Json, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};
use std::str::FromStr;

use dispensario_api::{ApiError, ApiResponse};
use dispensario_auth::{AuthContext, Role, verify_password};
use dispensario_core::RecordType;
use dispensario_storage::{FieldFilter, ListParams, RecordStorage};

use crate::routes::users::user_json;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<ApiResponse<Value>, ApiError> {
    // Inactive users are filtered out here: the default search hides them
    let result = state
        .storage
        .search(
            RecordType::User,
            &ListParams::new().with_filter(FieldFilter::Exact {
                field: "username".into(),
                value: body.username.clone(),
            }),
        )
        .await?;

    let Some(user) = result.records.into_iter().next() else {
        tracing::debug!(username = %body.username, "login for unknown username");
        return Err(ApiError::unauthorized("Invalid credentials"));
    };

    let hash = user.str_field("passwordHash").unwrap_or_default();
    if !verify_password(&body.password, hash) {
        tracing::debug!(username = %body.username, "login with wrong password");
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let role = user
        .str_field("role")
        .and_then(|r| Role::from_str(r).ok())
        .ok_or_else(|| ApiError::internal("user record has no valid role"))?;
    let name = user
        .str_field("name")
        .or(user.str_field("username"))
        .unwrap_or_default();

    let token = state
        .tokens
        .issue(&user.id, name, role)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    tracing::info!(user = %user.id, username = %body.username, "login");
    Ok(ApiResponse::ok(json!({
        "ok": true,
        "token": token,
        "user": user_json(&user),
    })))
}

pub async fn renew(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<ApiResponse<Value>, ApiError> {
    let token = state
        .tokens
        .issue(&ctx.user_id, &ctx.name, ctx.role)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok(ApiResponse::ok(json!({
        "ok": true,
        "token": token,
    })))
}
