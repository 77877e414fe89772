//! Compiled lookup over a semantic manifest.
//!
//! Compilation binds every metric to its measure and semantic model and works
//! out which dimensions the metric can be grouped by:
//! - the model's own dimensions, qualified by its primary entity
//! - dimensions of models reachable through one foreign entity hop
//! - `metric_time`, when the measure has an aggregation time dimension

use std::collections::{HashMap, HashSet};

use metricgate_core::error::BuildError;
use metricgate_core::model::{DimensionDescriptor, DimensionType, MetricDescriptor, MetricType};

use crate::manifest::{EntityType, Metric, SemanticManifest, SemanticModel};

pub const METRIC_TIME: &str = "metric_time";

/// Where a group-by column comes from, relative to the measure's model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DimensionSource {
    Local,
    Joined { entity: String, model: usize },
    MetricTime,
}

#[derive(Debug, Clone)]
pub struct ResolvedDimension {
    pub qualified_name: String,
    pub column: String,
    pub source: DimensionSource,
    pub descriptor: DimensionDescriptor,
}

#[derive(Debug, Clone)]
pub struct MeasureBinding {
    pub model: usize,
    pub measure: String,
}

#[derive(Debug, Clone)]
pub struct CompiledMetric {
    pub metric: Metric,
    pub binding: Option<MeasureBinding>,
    pub dimensions: Vec<ResolvedDimension>,
}

impl CompiledMetric {
    pub fn dimension(&self, qualified_name: &str) -> Option<&ResolvedDimension> {
        self.dimensions.iter().find(|d| d.qualified_name == qualified_name)
    }

    pub fn descriptor(&self) -> MetricDescriptor {
        MetricDescriptor {
            name: self.metric.name.clone(),
            description: self.metric.description.clone(),
            metric_type: self.metric.metric_type,
            label: self.metric.label.clone(),
            dimensions: self.dimensions.iter().map(|d| d.descriptor.clone()).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SemanticCatalog {
    models: Vec<SemanticModel>,
    metrics: Vec<CompiledMetric>,
    by_name: HashMap<String, usize>,
}

impl SemanticCatalog {
    pub fn compile(manifest: SemanticManifest) -> Result<Self, BuildError> {
        let SemanticManifest { semantic_models: models, metrics } = manifest;

        // measure name -> model index
        let mut measures: HashMap<&str, usize> = HashMap::new();
        for (idx, model) in models.iter().enumerate() {
            for m in &model.measures {
                if measures.insert(m.name.as_str(), idx).is_some() {
                    return Err(BuildError::Rejected(format!(
                        "measure `{}` is defined in more than one semantic model",
                        m.name
                    )));
                }
            }
        }

        let mut compiled = Vec::with_capacity(metrics.len());
        let mut by_name = HashMap::new();
        for metric in metrics {
            if by_name.contains_key(&metric.name) {
                return Err(BuildError::Rejected(format!("metric `{}` is defined twice", metric.name)));
            }

            let binding = match (&metric.metric_type, &metric.type_params.measure) {
                (_, Some(r)) => {
                    let model = *measures.get(r.name.as_str()).ok_or_else(|| {
                        BuildError::Rejected(format!(
                            "metric `{}` references unknown measure `{}`",
                            metric.name, r.name
                        ))
                    })?;
                    Some(MeasureBinding { model, measure: r.name.clone() })
                }
                (MetricType::Simple, None) => {
                    return Err(BuildError::Rejected(format!(
                        "simple metric `{}` must reference a measure",
                        metric.name
                    )));
                }
                (_, None) => None,
            };

            let dimensions = match &binding {
                Some(b) => resolve_dimensions(&models, b)?,
                None => Vec::new(),
            };

            by_name.insert(metric.name.clone(), compiled.len());
            compiled.push(CompiledMetric { metric, binding, dimensions });
        }

        Ok(Self { models, metrics: compiled, by_name })
    }

    pub fn metric(&self, name: &str) -> Option<&CompiledMetric> {
        self.by_name.get(name).and_then(|&i| self.metrics.get(i))
    }

    pub fn metrics(&self) -> &[CompiledMetric] {
        &self.metrics
    }

    pub fn model(&self, idx: usize) -> Option<&SemanticModel> {
        self.models.get(idx)
    }

    pub fn descriptors(&self) -> Vec<MetricDescriptor> {
        self.metrics.iter().map(CompiledMetric::descriptor).collect()
    }
}

fn resolve_dimensions(models: &[SemanticModel], binding: &MeasureBinding) -> Result<Vec<ResolvedDimension>, BuildError> {
    let Some(home) = models.get(binding.model) else {
        return Err(BuildError::Internal(format!("model index {} out of range", binding.model)));
    };
    let mut out = Vec::new();
    let mut seen = HashSet::new();

    // metric_time
    let agg_time = home
        .measure(&binding.measure)
        .and_then(|m| m.agg_time_dimension.clone())
        .or_else(|| home.defaults.as_ref().and_then(|d| d.agg_time_dimension.clone()));
    if let Some(name) = agg_time {
        let dim = home
            .dimension(&name)
            .filter(|d| d.dimension_type == DimensionType::Time)
            .ok_or_else(|| {
                BuildError::Rejected(format!(
                    "measure `{}`: aggregation time dimension `{}` is not a time dimension of `{}`",
                    binding.measure, name, home.name
                ))
            })?;
        seen.insert(METRIC_TIME.to_string());
        out.push(ResolvedDimension {
            qualified_name: METRIC_TIME.to_string(),
            column: dim.column().to_string(),
            source: DimensionSource::MetricTime,
            descriptor: DimensionDescriptor {
                name: METRIC_TIME.to_string(),
                qualified_name: METRIC_TIME.to_string(),
                description: dim.description.clone(),
                dimension_type: DimensionType::Time,
                label: None,
                time_granularity: dim.time_granularity().map(str::to_string),
            },
        });
    }

    // own dimensions
    let prefix = home.primary_entity_name();
    for d in &home.dimensions {
        let qualified = match prefix {
            Some(p) => format!("{p}__{}", d.name),
            None => d.name.clone(),
        };
        if !seen.insert(qualified.clone()) {
            continue;
        }
        out.push(ResolvedDimension {
            column: d.column().to_string(),
            source: DimensionSource::Local,
            descriptor: DimensionDescriptor {
                name: d.name.clone(),
                qualified_name: qualified.clone(),
                description: d.description.clone(),
                dimension_type: d.dimension_type,
                label: d.label.clone(),
                time_granularity: d.time_granularity().map(str::to_string),
            },
            qualified_name: qualified,
        });
    }

    // one hop through foreign entities
    for fk in home.entities.iter().filter(|e| e.entity_type == EntityType::Foreign) {
        for (idx, other) in models.iter().enumerate() {
            if idx == binding.model {
                continue;
            }
            let joinable = other
                .entity(&fk.name)
                .is_some_and(|e| e.entity_type != EntityType::Foreign);
            if !joinable {
                continue;
            }
            for d in &other.dimensions {
                let qualified = format!("{}__{}", fk.name, d.name);
                if !seen.insert(qualified.clone()) {
                    continue;
                }
                out.push(ResolvedDimension {
                    column: d.column().to_string(),
                    source: DimensionSource::Joined { entity: fk.name.clone(), model: idx },
                    descriptor: DimensionDescriptor {
                        name: d.name.clone(),
                        qualified_name: qualified.clone(),
                        description: d.description.clone(),
                        dimension_type: d.dimension_type,
                        label: d.label.clone(),
                        time_granularity: d.time_granularity().map(str::to_string),
                    },
                    qualified_name: qualified,
                });
            }
        }
    }

    Ok(out)
}
