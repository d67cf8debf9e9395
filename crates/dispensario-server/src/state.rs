use std::sync::Arc;

use dispensario_auth::TokenService;
use dispensario_storage::DynStorage;

use crate::config::AppConfig;

/// Shared application state for handlers.
#[derive(Clone)]
pub struct AppState {
    pub storage: DynStorage,
    pub tokens: Arc<TokenService>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(storage: DynStorage, tokens: Arc<TokenService>, config: Arc<AppConfig>) -> Self {
        Self {
            storage,
            tokens,
            config,
        }
    }
}
