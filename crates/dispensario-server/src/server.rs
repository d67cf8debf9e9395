use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use dispensario_auth::{AuthState, TokenService, authentication_middleware};
use dispensario_storage::DynStorage;

use crate::config::AppConfig;
use crate::directory::StorageUserDirectory;
use crate::state::AppState;
use crate::{bootstrap, handlers, middleware as app_middleware, routes};

fn _assert_send() {
    fn is_send<F: Send>(_: F) {}
    let st = unsafe { std::mem::zeroed::<AuthState>() };
    let req = unsafe { std::mem::zeroed::<axum::http::Request<axum::body::Body>>() };
    let next = unsafe { std::mem::zeroed::<axum::middleware::Next>() };
    is_send(authentication_middleware(axum::extract::State(st), req, next));
}

pub struct DispensarioServer {
    addr: SocketAddr,
    app: Router,
}

/// Build the application router over a fresh in-memory store.
pub async fn build_app(cfg: &AppConfig) -> anyhow::Result<Router> {
    build_app_with_storage(cfg, dispensario_db_memory::create_storage()).await
}

/// Build the application router over the given storage backend.
pub async fn build_app_with_storage(
    cfg: &AppConfig,
    storage: DynStorage,
) -> anyhow::Result<Router> {
    bootstrap::seed(&cfg.bootstrap, &storage).await?;

    let tokens = Arc::new(TokenService::new(
        &cfg.auth.jwt_secret,
        cfg.auth.token_ttl_seconds,
    ));
    let directory = Arc::new(StorageUserDirectory::new(storage.clone()));
    let auth_state = AuthState::new(tokens.clone(), directory);
    let state = AppState::new(storage, tokens, Arc::new(cfg.clone()));

    let api = Router::new()
        // Session endpoints
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/renew", get(routes::auth::renew))
        // Patients
        .route(
            "/patients",
            get(routes::patients::list).post(routes::patients::create),
        )
        .route(
            "/patients/{id}",
            get(routes::patients::read)
                .put(routes::patients::update)
                .delete(routes::patients::delete),
        )
        // Appointments
        .route(
            "/appointments",
            get(routes::appointments::list).post(routes::appointments::create),
        )
        .route(
            "/appointments/{id}",
            get(routes::appointments::read)
                .put(routes::appointments::update)
                .delete(routes::appointments::delete),
        )
        // Triage
        .route(
            "/triage",
            get(routes::triage::list).post(routes::triage::create),
        )
        .route(
            "/triage/{id}",
            get(routes::triage::read)
                .put(routes::triage::update)
                .delete(routes::triage::delete),
        )
        // Attentions and their nested resources
        .route(
            "/attentions",
            get(routes::attentions::list).post(routes::attentions::create),
        )
        .route(
            "/attentions/{id}",
            get(routes::attentions::read)
                .put(routes::attentions::update)
                .delete(routes::attentions::delete),
        )
        .route(
            "/attentions/{id}/diagnoses",
            get(routes::attentions::list_diagnoses).post(routes::attentions::create_diagnosis),
        )
        .route(
            "/diagnoses/{id}",
            axum::routing::put(routes::attentions::update_diagnosis)
                .delete(routes::attentions::delete_diagnosis),
        )
        .route(
            "/diagnoses/{id}/procedures",
            get(routes::attentions::list_procedures).post(routes::attentions::create_procedure),
        )
        .route(
            "/procedures/{id}",
            axum::routing::delete(routes::attentions::delete_procedure),
        )
        .route(
            "/attentions/{id}/prescriptions",
            get(routes::attentions::list_prescriptions)
                .post(routes::attentions::create_prescription),
        )
        .route(
            "/prescriptions/{id}",
            axum::routing::delete(routes::attentions::delete_prescription),
        )
        // Printable documents
        .route(
            "/attentions/{id}/certificate",
            get(routes::attentions::certificate),
        )
        .route(
            "/attentions/{id}/prescription-sheet",
            get(routes::attentions::prescription_sheet),
        )
        // Contraceptive follow-up
        .route(
            "/contraceptives",
            get(routes::contraceptives::list).post(routes::contraceptives::create),
        )
        .route(
            "/contraceptives/{id}",
            get(routes::contraceptives::read)
                .put(routes::contraceptives::update)
                .delete(routes::contraceptives::delete),
        )
        // Activities
        .route(
            "/activities",
            get(routes::activities::list).post(routes::activities::create),
        )
        .route(
            "/activities/{id}",
            get(routes::activities::read)
                .put(routes::activities::update)
                .delete(routes::activities::delete),
        )
        // Administration
        .route(
            "/users",
            get(routes::users::list).post(routes::users::create),
        )
        .route(
            "/users/{id}",
            get(routes::users::read)
                .put(routes::users::update)
                .delete(routes::users::delete),
        )
        .route(
            "/companies",
            get(routes::companies::list).post(routes::companies::create),
        )
        .route(
            "/companies/{id}",
            get(routes::companies::read)
                .put(routes::companies::update)
                .delete(routes::companies::delete),
        )
        // Reports
        .route("/reports/attentions", get(routes::reports::attentions))
        .route("/reports/activities", get(routes::reports::activities));

    let app = Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .route("/favicon.ico", get(handlers::favicon))
        .nest("/api/v1", api)
        // Middleware stack (order: request id -> auth -> cors -> trace)
        .layer(middleware::from_fn(app_middleware::request_id))
        .layer(middleware::from_fn_with_state(
            auth_state,
            authentication_middleware,
        ))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &axum::http::Request<_>| {
                let req_id = req
                    .extensions()
                    .get::<axum::http::HeaderValue>()
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                tracing::info_span!(
                    "http.request",
                    http.method = %req.method(),
                    http.target = %req.uri(),
                    request_id = %req_id
                )
            }),
        )
        .with_state(state);

    Ok(app)
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    pub async fn build(self) -> anyhow::Result<DispensarioServer> {
        let app = build_app(&self.config).await?;
        Ok(DispensarioServer {
            addr: self.addr,
            app,
        })
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DispensarioServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
