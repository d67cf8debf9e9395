//! HTTP server for the dispensary management system.
//!
//! Wires the record store, token service and authentication middleware into
//! the `/api/v1` REST surface: patients, appointments, triage, attentions
//! (with diagnoses, procedures and prescriptions), contraceptive follow-up,
//! activities, users, companies and report downloads.

pub mod bootstrap;
pub mod config;
pub mod directory;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod routes;
pub mod server;
pub mod state;
pub mod validation;

pub use config::{AppConfig, BootstrapConfig};
pub use server::{DispensarioServer, ServerBuilder, build_app, build_app_with_storage};
pub use state::AppState;
