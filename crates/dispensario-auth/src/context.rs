use dispensario_core::normalize_company_code;
use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::token::Role;

/// Per-request authentication context, stored in request extensions by the
/// authentication middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: String,
    pub name: String,
    pub role: Role,
    /// Every company code the user may touch (normalized).
    pub permitted_companies: Vec<String>,
    /// The subset this request operates on: the permitted set, optionally
    /// narrowed by the `x-active-companies` header.
    pub active_companies: Vec<String>,
}

impl AuthContext {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Whether a company code falls inside this request's scope.
    pub fn can_access(&self, company: &str) -> bool {
        let company = normalize_company_code(company);
        self.active_companies.iter().any(|c| *c == company)
    }

    pub fn scope(&self) -> &[String] {
        &self.active_companies
    }
}

/// Resolve the effective company scope of a request.
///
/// Without the header the scope is the full permitted set. With it, the
/// declared companies narrow the scope, and naming a company outside the
/// permitted set rejects the request outright rather than silently dropping
/// the code.
pub fn resolve_active_companies(
    permitted: &[String],
    header: Option<&str>,
) -> Result<Vec<String>, AuthError> {
    let permitted: Vec<String> = permitted
        .iter()
        .map(|c| normalize_company_code(c))
        .collect();

    let Some(header) = header else {
        return Ok(permitted);
    };

    let requested: Vec<String> = header
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(normalize_company_code)
        .collect();

    if requested.is_empty() {
        return Err(AuthError::forbidden(
            "x-active-companies header names no companies",
        ));
    }

    for code in &requested {
        if !permitted.contains(code) {
            return Err(AuthError::forbidden(format!(
                "company '{code}' is outside the permitted set"
            )));
        }
    }

    Ok(requested)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn permitted() -> Vec<String> {
        vec!["SEDE01".into(), "sede02".into()]
    }

    #[test]
    fn no_header_grants_full_permitted_set() {
        let scope = resolve_active_companies(&permitted(), None).unwrap();
        assert_eq!(scope, vec!["SEDE01".to_string(), "SEDE02".to_string()]);
    }

    #[test]
    fn header_narrows_scope() {
        let scope = resolve_active_companies(&permitted(), Some("sede02")).unwrap();
        assert_eq!(scope, vec!["SEDE02".to_string()]);
    }

    #[test]
    fn header_accepts_lists_with_whitespace() {
        let scope = resolve_active_companies(&permitted(), Some(" SEDE01 , sede02 ")).unwrap();
        assert_eq!(scope.len(), 2);
    }

    #[test]
    fn overreach_is_rejected() {
        let err = resolve_active_companies(&permitted(), Some("SEDE01,SEDE99")).unwrap_err();
        match err {
            AuthError::Forbidden(msg) => assert!(msg.contains("SEDE99")),
            other => panic!("expected Forbidden, got {other:?}"),
        }
    }

    #[test]
    fn empty_header_is_rejected() {
        assert!(resolve_active_companies(&permitted(), Some("")).is_err());
        assert!(resolve_active_companies(&permitted(), Some(" , ")).is_err());
    }

    #[test]
    fn context_scope_check_normalizes() {
        let ctx = AuthContext {
            user_id: "u-1".into(),
            name: "Dra. Salas".into(),
            role: Role::Medico,
            permitted_companies: vec!["SEDE01".into()],
            active_companies: vec!["SEDE01".into()],
        };
        assert!(ctx.can_access("sede01"));
        assert!(ctx.can_access(" SEDE01 "));
        assert!(!ctx.can_access("SEDE02"));
        assert!(!ctx.is_admin());
    }
}
