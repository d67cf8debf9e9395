//! Authentication and company-scope authorization for the dispensary server.
//!
//! Provides HS256 access tokens, argon2 password hashing, and the axum
//! middleware that turns a Bearer token plus the optional
//! `x-active-companies` header into an [`AuthContext`].

pub mod context;
pub mod error;
pub mod middleware;
pub mod password;
pub mod token;

pub use context::{AuthContext, resolve_active_companies};
pub use error::AuthError;
pub use middleware::{
    ACTIVE_COMPANIES_HEADER, AuthState, DirectoryUser, UserDirectory, authentication_middleware,
    should_skip_authentication,
};
pub use password::{hash_password, verify_password};
pub use token::{Claims, Role, TokenService};
