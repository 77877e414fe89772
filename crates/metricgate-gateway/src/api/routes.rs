//! Read-tier routes plus the unauthenticated health probe.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use metricgate_core::engine::SemanticEngine;
use metricgate_core::error::{EngineError, GateError};
use metricgate_core::model::MetricQuery;

use crate::app_state::AppState;
use crate::error::ApiError;

use super::schemas::{HealthResponse, MetricResponse, QueryRequest, QueryResponse};

const NOT_LOADED: &str = "No manifest loaded, POST /admin/refresh first";

fn require_engine(state: &AppState) -> Result<Arc<dyn SemanticEngine>, ApiError> {
    state
        .engines()
        .current()
        .ok_or(ApiError(GateError::NotReady(NOT_LOADED)))
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    if state.engines().is_ready() {
        (StatusCode::OK, Json(HealthResponse { status: "ready" }))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(HealthResponse { status: "not_ready" }))
    }
}

pub async fn list_metrics(State(state): State<AppState>) -> Result<Json<Vec<MetricResponse>>, ApiError> {
    let engine = require_engine(&state)?;
    Ok(Json(engine.list_metrics().iter().map(MetricResponse::from).collect()))
}

pub async fn query(
    State(state): State<AppState>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, ApiError> {
    let Json(body) = body?;
    if body.metrics.is_empty() {
        return Err(GateError::Unprocessable("metrics must name at least one metric".into()).into());
    }
    let engine = require_engine(&state)?;

    let request = MetricQuery::from(body);
    tracing::debug!(metrics = ?request.metric_names, group_by = ?request.group_by_names, "query");

    let result = engine.query(request).await.map_err(query_error)?;
    tracing::debug!(rows = result.table.row_count(), "query finished");
    Ok(Json(QueryResponse::from_table(result.sql, &result.table)))
}

fn query_error(err: EngineError) -> ApiError {
    let mapped = match err {
        EngineError::Invalid(message) => {
            tracing::info!(%message, "query rejected by engine");
            GateError::BadRequest(message)
        }
        EngineError::Execution(cause) => {
            tracing::error!(kind = %cause.kind, message = %cause.message, "warehouse execution error");
            GateError::Upstream(format!("Warehouse error ({}): {}", cause.kind, cause.message))
        }
        EngineError::Unexpected(cause) => {
            tracing::error!(kind = %cause.kind, message = %cause.message, "unexpected query error");
            GateError::Internal(format!("Internal error ({}): {}", cause.kind, cause.message))
        }
    };
    ApiError(mapped)
}
