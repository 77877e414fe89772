//! Mock engine collaborators and an in-process request helper.

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use metricgate_core::engine::{
    AdapterBinding, AdapterFactory, EngineBuilder, ProfileLocation, SemanticEngine, WarehouseClient,
};
use metricgate_core::error::{AdapterError, BuildError, EngineError, RootCause};
use metricgate_core::model::{
    CellValue, DataTable, DimensionDescriptor, DimensionType, MetricDescriptor, MetricQuery, MetricType, QueryResult,
};
use metricgate_gateway::auth::Credentials;
use metricgate_gateway::{build_router, AppState, EngineManager};

pub const API_KEY: &str = "read-secret";
pub const ADMIN_KEY: &str = "admin-secret";

/// How the mock engine answers queries; picked by the manifest's `"mode"`.
#[derive(Debug, Clone, Copy)]
pub enum Mode {
    Rows,
    Invalid,
    Execution,
    Unexpected,
}

pub struct MockEngine {
    metrics: Vec<MetricDescriptor>,
    mode: Mode,
}

#[async_trait]
impl SemanticEngine for MockEngine {
    fn list_metrics(&self) -> Vec<MetricDescriptor> {
        self.metrics.clone()
    }

    async fn query(&self, query: MetricQuery) -> Result<QueryResult, EngineError> {
        match self.mode {
            Mode::Rows => {
                let mut table = DataTable::new(vec!["location__location_name".into(), "revenue".into()]);
                table.push_row(vec![CellValue::Text("Paris".into()), CellValue::Float(1234.56)]);
                table.push_row(vec![CellValue::Text("Lyon".into()), CellValue::Float(789.01)]);
                Ok(QueryResult {
                    sql: format!("SELECT {}", query.metric_names.join(", ")),
                    table,
                })
            }
            Mode::Invalid => Err(EngineError::Invalid(format!(
                "Unable to find metric `{}`",
                query.metric_names[0]
            ))),
            Mode::Execution => Err(EngineError::Execution(RootCause::new("OperationalError", "connection reset"))),
            Mode::Unexpected => Err(EngineError::Unexpected(RootCause::new("KeyError", "'revenue'"))),
        }
    }
}

fn metric(name: &str) -> MetricDescriptor {
    MetricDescriptor {
        name: name.to_string(),
        description: Some(format!("{name} description")),
        metric_type: MetricType::Simple,
        label: None,
        dimensions: vec![
            DimensionDescriptor {
                name: "metric_time".into(),
                qualified_name: "metric_time".into(),
                description: None,
                dimension_type: DimensionType::Time,
                label: None,
                time_granularity: Some("day".into()),
            },
            DimensionDescriptor {
                name: "location_name".into(),
                qualified_name: "location__location_name".into(),
                description: None,
                dimension_type: DimensionType::Categorical,
                label: Some("Location".into()),
                time_granularity: None,
            },
        ],
    }
}

/// Reads `{"metrics": [...], "mode": "...", "reject": bool, "explode": bool}`.
pub struct MockBuilder;

impl EngineBuilder for MockBuilder {
    fn build(&self, manifest_json: &str, _client: Arc<dyn WarehouseClient>) -> Result<Arc<dyn SemanticEngine>, BuildError> {
        let doc: Value = serde_json::from_str(manifest_json).map_err(|e| BuildError::Rejected(e.to_string()))?;
        if doc["reject"].as_bool() == Some(true) {
            return Err(BuildError::Rejected("metric `ghost` references unknown measure `nope`".into()));
        }
        if doc["explode"].as_bool() == Some(true) {
            return Err(BuildError::Internal("adapter exploded".into()));
        }
        let metrics = doc["metrics"]
            .as_array()
            .ok_or_else(|| BuildError::Rejected("missing field `metrics`".into()))?
            .iter()
            .filter_map(Value::as_str)
            .map(metric)
            .collect();
        let mode = match doc["mode"].as_str() {
            Some("invalid") => Mode::Invalid,
            Some("execution") => Mode::Execution,
            Some("unexpected") => Mode::Unexpected,
            _ => Mode::Rows,
        };
        Ok(Arc::new(MockEngine { metrics, mode }))
    }
}

pub struct MockClient;

#[async_trait]
impl WarehouseClient for MockClient {
    fn adapter_type(&self) -> &str {
        "mock"
    }

    async fn execute(&self, _sql: &str) -> Result<DataTable, EngineError> {
        Ok(DataTable::default())
    }
}

pub struct MockFactory;

impl AdapterFactory for MockFactory {
    fn connect(&self, _location: &ProfileLocation) -> Result<AdapterBinding, AdapterError> {
        Ok(AdapterBinding {
            client: Arc::new(MockClient),
            warnings: vec!["target `dev` does not set `threads`".into()],
        })
    }
}

pub fn location() -> ProfileLocation {
    ProfileLocation {
        profiles_dir: "/nonexistent".into(),
        profile_name: "metricflow_server".into(),
    }
}

pub fn manager() -> Arc<EngineManager> {
    let engines = Arc::new(EngineManager::new(Arc::new(MockBuilder)));
    engines.bootstrap(&MockFactory, &location()).unwrap();
    engines
}

pub fn app_with_limit(engines: Arc<EngineManager>, max_manifest_bytes: usize) -> Router {
    build_router(AppState::with_credentials(
        Credentials::new(API_KEY, ADMIN_KEY),
        engines,
        max_manifest_bytes,
    ))
}

pub fn app(engines: Arc<EngineManager>) -> Router {
    app_with_limit(engines, 1024 * 1024)
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Value,
}

pub async fn send(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<&str>) -> TestResponse {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    if body.is_some() {
        req = req.header(header::CONTENT_TYPE, "application/json");
    }
    let req = req.body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty)).unwrap();

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    TestResponse { status, headers, body }
}

pub async fn get(app: &Router, uri: &str, token: Option<&str>) -> TestResponse {
    send(app, Method::GET, uri, token, None).await
}

pub async fn post(app: &Router, uri: &str, token: Option<&str>, body: &str) -> TestResponse {
    send(app, Method::POST, uri, token, Some(body)).await
}

pub async fn refresh(app: &Router, manifest: &str) -> TestResponse {
    post(app, "/admin/refresh", Some(ADMIN_KEY), manifest).await
}
