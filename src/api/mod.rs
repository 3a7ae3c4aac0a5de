//! REST API surface.

pub mod error;
pub mod handlers;

use axum::routing::{get, post};
use axum::Router;

use crate::server::AppState;

/// Build the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/contracts/:id/verify", post(handlers::verify_contract))
        .route("/contracts/:id/approvals", post(handlers::log_approval))
        .route("/contracts/:id/status", get(handlers::contract_status))
        .route("/hashes/check", post(handlers::check_hash))
        .route("/hashes/:hash/approvals", get(handlers::approvals_by_hash))
        .route("/hashes/:hash/audit-log", get(handlers::audit_log_by_hash))
        .route("/registry/health", get(handlers::registry_health))
}
