//! JWT issuance and validation.
//!
//! Tokens are HS256 with a single shared secret. Claims carry the user id,
//! display name and role; company permissions are resolved from the user
//! record at request time so a permission change takes effect without
//! re-issuing tokens.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;

use crate::error::AuthError;

/// User roles of the dispensary staff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "ADMIN")]
    Admin,
    #[serde(rename = "MEDICO")]
    Medico,
    #[serde(rename = "ENFERMERIA")]
    Enfermeria,
    #[serde(rename = "ADMISION")]
    Admision,
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Medico => "MEDICO",
            Role::Enfermeria => "ENFERMERIA",
            Role::Admision => "ADMISION",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Role::Admin),
            "MEDICO" => Ok(Role::Medico),
            "ENFERMERIA" => Ok(Role::Enfermeria),
            "ADMISION" => Ok(Role::Admision),
            other => Err(AuthError::internal(format!("unknown role '{other}'"))),
        }
    }
}

/// Access token claims.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Subject: the user record id.
    pub sub: String,
    /// Display name, shown by clients without an extra lookup.
    pub name: String,
    /// Role at issue time.
    pub role: Role,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
    /// Token id.
    pub jti: String,
}

/// Encodes and validates access tokens.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_seconds: i64,
}

impl TokenService {
    pub fn new(secret: &str, ttl_seconds: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl_seconds,
        }
    }

    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    /// Issue a token for the given user with the configured TTL.
    pub fn issue(&self, user_id: &str, name: &str, role: Role) -> Result<String, AuthError> {
        self.issue_with_ttl(user_id, name, role, self.ttl_seconds)
    }

    /// Issue a token with an explicit TTL (renewal paths and tests).
    pub fn issue_with_ttl(
        &self,
        user_id: &str,
        name: &str,
        role: Role,
        ttl_seconds: i64,
    ) -> Result<String, AuthError> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            name: name.to_string(),
            role,
            iat: now,
            exp: now + ttl_seconds,
            jti: uuid::Uuid::new_v4().to_string(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(AuthError::from)
    }

    /// Decode and validate a token, returning its claims.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        let data = decode::<Claims>(token, &self.decoding_key, &validation)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new("test-secret", 3600)
    }

    #[test]
    fn issue_and_verify_roundtrip() {
        let svc = service();
        let token = svc.issue("u-1", "Dra. Salas", Role::Medico).unwrap();
        let claims = svc.verify(&token).unwrap();

        assert_eq!(claims.sub, "u-1");
        assert_eq!(claims.name, "Dra. Salas");
        assert_eq!(claims.role, Role::Medico);
        assert!(claims.exp > claims.iat);
        assert!(!claims.jti.is_empty());
    }

    #[test]
    fn expired_token_is_distinguished() {
        let svc = service();
        let token = svc
            .issue_with_ttl("u-1", "Dra. Salas", Role::Medico, -60)
            .unwrap();
        match svc.verify(&token) {
            Err(AuthError::TokenExpired) => {}
            other => panic!("expected TokenExpired, got {other:?}"),
        }
    }

    #[test]
    fn wrong_secret_is_invalid_not_expired() {
        let token = service().issue("u-1", "X", Role::Admin).unwrap();
        let other = TokenService::new("another-secret", 3600);
        match other.verify(&token) {
            Err(AuthError::InvalidToken(_)) => {}
            other => panic!("expected InvalidToken, got {other:?}"),
        }
    }

    #[test]
    fn garbage_token_is_invalid() {
        match service().verify("not.a.token") {
            Err(AuthError::InvalidToken(_)) => {}
            other => panic!("expected InvalidToken, got {other:?}"),
        }
    }

    #[test]
    fn tokens_get_unique_ids() {
        let svc = service();
        let a = svc.issue("u-1", "X", Role::Admin).unwrap();
        let b = svc.issue("u-1", "X", Role::Admin).unwrap();
        assert_ne!(svc.verify(&a).unwrap().jti, svc.verify(&b).unwrap().jti);
    }

    #[test]
    fn role_wire_values() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"ADMIN\"");
        assert_eq!(serde_json::to_string(&Role::Medico).unwrap(), "\"MEDICO\"");
        assert_eq!(Role::from_str("ENFERMERIA").unwrap(), Role::Enfermeria);
        assert_eq!(Role::from_str("ADMISION").unwrap(), Role::Admision);
        assert!(Role::from_str("admin").is_err());
        assert!(Role::Admin.is_admin());
        assert!(!Role::Medico.is_admin());
    }
}
