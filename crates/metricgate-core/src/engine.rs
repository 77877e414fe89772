//! Engine and adapter contracts.
//!
//! The gateway treats the semantic engine and the warehouse adapter as black
//! boxes reached through these traits. A concrete implementation lives in
//! `metricgate-engine`; tests plug in mocks.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{AdapterError, BuildError, EngineError};
use crate::model::{DataTable, MetricDescriptor, MetricQuery, QueryResult};

/// A compiled, immutable semantic model bound to a warehouse client.
#[async_trait]
pub trait SemanticEngine: Send + Sync {
    fn list_metrics(&self) -> Vec<MetricDescriptor>;
    async fn query(&self, request: MetricQuery) -> Result<QueryResult, EngineError>;
}

/// Turns raw manifest text into a fresh [`SemanticEngine`].
///
/// Called outside any lock; may be slow.
pub trait EngineBuilder: Send + Sync {
    fn build(
        &self,
        manifest_json: &str,
        client: Arc<dyn WarehouseClient>,
    ) -> Result<Arc<dyn SemanticEngine>, BuildError>;
}

/// Executes generated SQL against the warehouse.
#[async_trait]
pub trait WarehouseClient: Send + Sync {
    fn adapter_type(&self) -> &str;
    async fn execute(&self, sql: &str) -> Result<DataTable, EngineError>;
}

/// Where the warehouse profile lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileLocation {
    /// Directory containing `profiles.yml`.
    pub profiles_dir: PathBuf,
    pub profile_name: String,
}

/// Result of a successful adapter bootstrap.
pub struct AdapterBinding {
    pub client: Arc<dyn WarehouseClient>,
    /// Non-critical findings; logged, never fatal.
    pub warnings: Vec<String>,
}

/// Resolves profile data, checks connectivity and builds the warehouse client.
pub trait AdapterFactory: Send + Sync {
    fn connect(&self, location: &ProfileLocation) -> Result<AdapterBinding, AdapterError>;
}
