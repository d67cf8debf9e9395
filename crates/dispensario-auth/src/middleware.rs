//! Authentication middleware.
//!
//! Validates the Bearer token, loads the user, resolves the company scope
//! and stores an [`AuthContext`] in request extensions for handlers.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::context::{AuthContext, resolve_active_companies};
use crate::error::AuthError;
use crate::token::{Role, TokenService};

/// Header narrowing a request to a subset of the user's companies.
pub const ACTIVE_COMPANIES_HEADER: &str = "x-active-companies";

/// A user as the middleware needs it: identity, role, company permissions.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryUser {
    pub id: String,
    pub username: String,
    pub name: String,
    pub role: Role,
    pub companies: Vec<String>,
    pub active: bool,
}

/// Lookup of users backing token validation.
///
/// The server implements this over the record store; permissions are read per
/// request so revoking a company takes effect immediately.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<DirectoryUser>, AuthError>;
}

/// State required by the authentication middleware.
#[derive(Clone)]
pub struct AuthState {
    pub tokens: Arc<TokenService>,
    pub users: Arc<dyn UserDirectory>,
}

impl AuthState {
    pub fn new(tokens: Arc<TokenService>, users: Arc<dyn UserDirectory>) -> Self {
        Self { tokens, users }
    }
}

/// Authentication middleware.
///
/// Public endpoints pass through; everything else requires a valid Bearer
/// token. On success the [`AuthContext`] is stored in request extensions.
pub async fn authentication_middleware(
    State(state): State<AuthState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if should_skip_authentication(req.uri().path()) {
        return next.run(req).await;
    }

    match authenticate(&state, req.headers()).await {
        Ok(ctx) => {
            tracing::debug!(
                user = %ctx.user_id,
                role = %ctx.role,
                scope = ?ctx.active_companies,
                "request authenticated"
            );
            req.extensions_mut().insert(ctx);
            next.run(req).await
        }
        Err(e) => {
            tracing::debug!(error = %e, path = %req.uri().path(), "authentication failed");
            e.into_response()
        }
    }
}

async fn authenticate(state: &AuthState, headers: &HeaderMap) -> Result<AuthContext, AuthError> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AuthError::MissingToken)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AuthError::invalid_token("malformed Authorization header"))?;

    let claims = state.tokens.verify(token)?;

    let user = state
        .users
        .find_by_id(&claims.sub)
        .await?
        .ok_or_else(|| AuthError::invalid_token("unknown user"))?;

    if !user.active {
        return Err(AuthError::invalid_token("user is inactive"));
    }

    let scope_header = headers
        .get(ACTIVE_COMPANIES_HEADER)
        .and_then(|h| h.to_str().ok());
    let active_companies = resolve_active_companies(&user.companies, scope_header)?;

    Ok(AuthContext {
        user_id: user.id,
        name: user.name,
        // The stored role wins over the one frozen into the token
        role: user.role,
        permitted_companies: user
            .companies
            .iter()
            .map(|c| dispensario_core::normalize_company_code(c))
            .collect(),
        active_companies,
    })
}

/// Check if a path is public.
pub fn should_skip_authentication(path: &str) -> bool {
    let public_paths = ["/", "/healthz", "/readyz", "/favicon.ico"];
    if public_paths.contains(&path) {
        return true;
    }

    let public_prefixes = ["/api/v1/auth/login"];
    public_prefixes.iter().any(|prefix| path.starts_with(prefix))
}
