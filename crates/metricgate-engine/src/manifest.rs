//! Semantic manifest document (`semantic_manifest.json`).
//!
//! Only the fields the catalog and planner need are modelled. Everything else
//! a dbt build emits (metadata, configs, saved queries, ...) is ignored so full
//! manifests parse unchanged.

use serde::Deserialize;

use metricgate_core::error::BuildError;
use metricgate_core::model::{DimensionType, MetricType};

#[derive(Debug, Clone, Deserialize)]
pub struct SemanticManifest {
    pub semantic_models: Vec<SemanticModel>,
    pub metrics: Vec<Metric>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SemanticModel {
    pub name: String,
    pub node_relation: NodeRelation,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub defaults: Option<ModelDefaults>,
    #[serde(default)]
    pub primary_entity: Option<String>,
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub measures: Vec<Measure>,
    #[serde(default)]
    pub dimensions: Vec<Dimension>,
}

impl SemanticModel {
    /// Name of the entity that identifies one row of this model, if any.
    pub fn primary_entity_name(&self) -> Option<&str> {
        self.entities
            .iter()
            .find(|e| matches!(e.entity_type, EntityType::Primary | EntityType::Unique | EntityType::Natural))
            .map(|e| e.name.as_str())
            .or(self.primary_entity.as_deref())
    }

    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.name == name)
    }

    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    pub fn measure(&self, name: &str) -> Option<&Measure> {
        self.measures.iter().find(|m| m.name == name)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeRelation {
    pub alias: String,
    pub schema_name: String,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub relation_name: Option<String>,
}

impl NodeRelation {
    /// Fully qualified relation to select from.
    pub fn sql_relation(&self) -> String {
        if let Some(r) = self.relation_name.as_deref().filter(|r| !r.is_empty()) {
            return r.to_string();
        }
        if self.schema_name.is_empty() {
            self.alias.clone()
        } else {
            format!("{}.{}", self.schema_name, self.alias)
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelDefaults {
    #[serde(default)]
    pub agg_time_dimension: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Primary,
    Unique,
    Natural,
    Foreign,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Entity {
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    #[serde(default)]
    pub expr: Option<String>,
}

impl Entity {
    pub fn column(&self) -> &str {
        self.expr.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationType {
    Sum,
    Min,
    Max,
    Count,
    CountDistinct,
    SumBoolean,
    Average,
    Median,
    Percentile,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Measure {
    pub name: String,
    pub agg: AggregationType,
    #[serde(default)]
    pub expr: Option<String>,
    #[serde(default)]
    pub agg_time_dimension: Option<String>,
}

impl Measure {
    pub fn column(&self) -> &str {
        self.expr.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Dimension {
    pub name: String,
    #[serde(rename = "type")]
    pub dimension_type: DimensionType,
    #[serde(default)]
    pub expr: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub type_params: Option<DimensionTypeParams>,
}

impl Dimension {
    pub fn column(&self) -> &str {
        self.expr.as_deref().unwrap_or(&self.name)
    }

    pub fn time_granularity(&self) -> Option<&str> {
        self.type_params.as_ref()?.time_granularity.as_deref()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DimensionTypeParams {
    #[serde(default)]
    pub time_granularity: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Metric {
    pub name: String,
    #[serde(rename = "type")]
    pub metric_type: MetricType,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub type_params: MetricTypeParams,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricTypeParams {
    #[serde(default)]
    pub measure: Option<MeasureReference>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MeasureReference {
    pub name: String,
}

/// Parse manifest text; structural problems are reported as rejections.
pub fn parse_manifest(text: &str) -> Result<SemanticManifest, BuildError> {
    serde_json::from_str(text).map_err(|e| BuildError::Rejected(format!("invalid semantic manifest: {e}")))
}
