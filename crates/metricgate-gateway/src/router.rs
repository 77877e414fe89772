//! Axum router wiring.
//!
//! - `GET  /api/v1/health`  no auth
//! - `GET  /api/v1/metrics` read tier
//! - `POST /api/v1/query`   read tier
//! - `POST /admin/refresh`  admin tier, body capped at `MF_MAX_MANIFEST_BYTES`

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{middleware, Router};

use crate::api::{admin, routes};
use crate::app_state::AppState;
use crate::auth;

pub fn build_router(state: AppState) -> Router {
    let read = Router::new()
        .route("/api/v1/metrics", get(routes::list_metrics))
        .route("/api/v1/query", post(routes::query))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_read));

    let admin = Router::new()
        .route("/admin/refresh", post(admin::refresh))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_admin))
        .layer(DefaultBodyLimit::max(state.max_manifest_bytes()));

    Router::new()
        .route("/api/v1/health", get(routes::health))
        .merge(read)
        .merge(admin)
        .with_state(state)
}
