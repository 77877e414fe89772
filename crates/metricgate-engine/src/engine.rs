//! Manifest-backed [`SemanticEngine`].

use std::sync::Arc;

use async_trait::async_trait;

use metricgate_core::engine::{EngineBuilder, SemanticEngine, WarehouseClient};
use metricgate_core::error::{BuildError, EngineError};
use metricgate_core::model::{MetricDescriptor, MetricQuery, QueryResult};

use crate::catalog::SemanticCatalog;
use crate::manifest::parse_manifest;
use crate::planner;

pub struct ManifestEngine {
    catalog: SemanticCatalog,
    client: Arc<dyn WarehouseClient>,
}

impl ManifestEngine {
    pub fn new(catalog: SemanticCatalog, client: Arc<dyn WarehouseClient>) -> Self {
        Self { catalog, client }
    }

    pub fn catalog(&self) -> &SemanticCatalog {
        &self.catalog
    }
}

#[async_trait]
impl SemanticEngine for ManifestEngine {
    fn list_metrics(&self) -> Vec<MetricDescriptor> {
        self.catalog.descriptors()
    }

    async fn query(&self, request: MetricQuery) -> Result<QueryResult, EngineError> {
        let plan = planner::plan(&self.catalog, &request)?;
        tracing::debug!(sql = %plan.sql, "executing metric query");
        let mut table = self.client.execute(&plan.sql).await?;
        // result sets carry warehouse-side names; report the planned aliases
        if table.column_names.len() == plan.columns.len() {
            table.column_names = plan.columns;
        }
        Ok(QueryResult { sql: plan.sql, table })
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ManifestEngineBuilder;

impl ManifestEngineBuilder {
    pub fn new() -> Self {
        Self
    }
}

impl EngineBuilder for ManifestEngineBuilder {
    fn build(
        &self,
        manifest_json: &str,
        client: Arc<dyn WarehouseClient>,
    ) -> Result<Arc<dyn SemanticEngine>, BuildError> {
        let manifest = parse_manifest(manifest_json)?;
        let catalog = SemanticCatalog::compile(manifest)?;
        Ok(Arc::new(ManifestEngine::new(catalog, client)))
    }
}
