//! Admin-tier manifest refresh.

use axum::extract::State;
use axum::Json;
use bytes::Bytes;
use serde::de::IgnoredAny;

use metricgate_core::error::{BuildError, GateError};

use crate::app_state::AppState;
use crate::error::ApiError;

use super::schemas::StatusResponse;

const RELOAD_FAILED: &str = "Internal server error while loading manifest";

/// `POST /admin/refresh` with the raw `semantic_manifest.json` as body.
pub async fn refresh(State(state): State<AppState>, body: Bytes) -> Result<Json<StatusResponse>, ApiError> {
    let content = String::from_utf8(body.to_vec())
        .map_err(|e| GateError::BadRequest(format!("Body is not valid UTF-8: {e}")))?;
    if content.trim().is_empty() {
        return Err(GateError::BadRequest(
            "Empty body: send the semantic_manifest.json via --data-binary @file.json".into(),
        )
        .into());
    }
    serde_json::from_str::<IgnoredAny>(&content).map_err(|e| GateError::BadRequest(format!("Invalid JSON: {e}")))?;

    let engines = state.engines();
    let bytes = content.len();
    // manifest compilation is CPU-bound
    let outcome = tokio::task::spawn_blocking(move || engines.reload(&content)).await;

    match outcome {
        Ok(Ok(())) => {
            tracing::info!(bytes, "manifest refreshed");
            Ok(Json(StatusResponse { status: "ok" }))
        }
        Ok(Err(BuildError::Rejected(message))) => {
            tracing::warn!(%message, "manifest rejected");
            Err(GateError::BadRequest(format!("Invalid manifest: {message}")).into())
        }
        Ok(Err(BuildError::Internal(message))) => {
            tracing::error!(%message, "manifest reload failed");
            Err(GateError::Internal(RELOAD_FAILED.into()).into())
        }
        Err(join) => {
            tracing::error!(error = %join, "manifest reload task failed");
            Err(GateError::Internal(RELOAD_FAILED.into()).into())
        }
    }
}
