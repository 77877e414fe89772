//! Single-model query planner.
//!
//! Renders simple metrics from one semantic model, grouped by any dimension
//! the catalog resolved for them. Anything the planner cannot express is
//! reported as a customer-facing [`EngineError::Invalid`].
//!
//! Time dimensions can be coarsened with a `__<grain>` suffix on a group-by
//! (`metric_time__month`) or the second argument of a `TimeDimension` filter
//! template. Grains finer than the dimension's native grain are rejected.

use std::collections::BTreeMap;
use std::fmt;

use metricgate_core::error::EngineError;
use metricgate_core::model::{DimensionType, MetricQuery, MetricType};

use crate::catalog::{CompiledMetric, DimensionSource, ResolvedDimension, SemanticCatalog};
use crate::manifest::AggregationType;

const BASE_ALIAS: &str = "m";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
    pub sql: String,
    /// Output column names, group-bys first.
    pub columns: Vec<String>,
}

pub fn plan(catalog: &SemanticCatalog, query: &MetricQuery) -> Result<QueryPlan, EngineError> {
    if query.metric_names.is_empty() {
        return Err(EngineError::Invalid("at least one metric is required".into()));
    }

    let mut metrics: Vec<&CompiledMetric> = Vec::with_capacity(query.metric_names.len());
    for name in &query.metric_names {
        let m = catalog
            .metric(name)
            .ok_or_else(|| EngineError::Invalid(format!("Unable to find metric `{name}`")))?;
        if metrics.iter().any(|seen| seen.metric.name == m.metric.name) {
            continue;
        }
        metrics.push(m);
    }

    let mut model_idx = None;
    for m in &metrics {
        let binding = match (&m.metric.metric_type, &m.binding) {
            (MetricType::Simple, Some(b)) => b,
            (t, _) => {
                return Err(EngineError::Invalid(format!(
                    "metric `{}` has type {t}, which this engine cannot query",
                    m.metric.name
                )))
            }
        };
        match model_idx {
            None => model_idx = Some(binding.model),
            Some(idx) if idx != binding.model => {
                return Err(EngineError::Invalid(format!(
                    "metrics {:?} come from different semantic models and cannot be queried together",
                    query.metric_names
                )))
            }
            Some(_) => {}
        }
    }
    let model_idx = model_idx.ok_or_else(|| EngineError::Invalid("at least one metric is required".into()))?;
    let model = catalog
        .model(model_idx)
        .ok_or_else(|| EngineError::Invalid(format!("semantic model #{model_idx} is missing")))?;

    let mut joins = JoinSet::default();

    // group-bys, resolved against every requested metric
    let mut group_by: Vec<(&str, String)> = Vec::new();
    for name in &query.group_by_names {
        if group_by.iter().any(|(n, _)| *n == name.as_str()) {
            continue;
        }
        let (dim, grain) = resolve_grained(&metrics, name).ok_or_else(|| {
            EngineError::Invalid(format!(
                "Unable to resolve group-by `{name}` for metric(s) {:?}",
                query.metric_names
            ))
        })?;
        let expr = joins.column_expr(catalog, dim)?;
        group_by.push((name.as_str(), apply_grain(dim, expr, grain)?));
    }

    let mut select = Vec::new();
    let mut columns = Vec::new();
    for (name, expr) in &group_by {
        select.push(format!("{expr} AS {name}"));
        columns.push(name.to_string());
    }
    for m in &metrics {
        let measure_name = m.binding.as_ref().map(|b| b.measure.as_str()).unwrap_or_default();
        let measure = model
            .measure(measure_name)
            .ok_or_else(|| EngineError::Invalid(format!("measure `{measure_name}` is missing")))?;
        let col = qualify(BASE_ALIAS, measure.column());
        let agg = match measure.agg {
            AggregationType::Sum => format!("SUM({col})"),
            AggregationType::Min => format!("MIN({col})"),
            AggregationType::Max => format!("MAX({col})"),
            AggregationType::Count => format!("COUNT({col})"),
            AggregationType::CountDistinct => format!("COUNT(DISTINCT {col})"),
            AggregationType::SumBoolean => format!("SUM(CASE WHEN {col} THEN 1 ELSE 0 END)"),
            AggregationType::Average => format!("AVG({col})"),
            AggregationType::Median | AggregationType::Percentile => {
                return Err(EngineError::Invalid(format!(
                    "measure `{}` uses an aggregation this engine cannot render",
                    measure.name
                )))
            }
        };
        select.push(format!("{agg} AS {}", m.metric.name));
        columns.push(m.metric.name.clone());
    }

    let mut filters = Vec::with_capacity(query.where_constraints.len());
    for raw in &query.where_constraints {
        filters.push(render_filter(raw, catalog, &metrics, model, &mut joins)?);
    }

    let mut order_by = Vec::with_capacity(query.order_by_names.len());
    for raw in &query.order_by_names {
        let (name, desc) = match raw.strip_prefix('-') {
            Some(rest) => (rest, true),
            None => (raw.as_str(), false),
        };
        if !columns.iter().any(|c| c == name) {
            return Err(EngineError::Invalid(format!(
                "order-by `{name}` must be one of the requested metrics or group-bys"
            )));
        }
        order_by.push(if desc { format!("{name} DESC") } else { name.to_string() });
    }

    let mut sql = String::from("SELECT\n  ");
    sql.push_str(&select.join("\n  , "));
    sql.push_str(&format!("\nFROM {} AS {BASE_ALIAS}", model.node_relation.sql_relation()));
    for join in joins.render(catalog, model) {
        sql.push('\n');
        sql.push_str(&join);
    }
    if !filters.is_empty() {
        sql.push_str("\nWHERE ");
        sql.push_str(&filters.iter().map(|f| format!("({f})")).collect::<Vec<_>>().join(" AND "));
    }
    if !group_by.is_empty() {
        sql.push_str("\nGROUP BY\n  ");
        sql.push_str(&group_by.iter().map(|(_, e)| e.as_str()).collect::<Vec<_>>().join("\n  , "));
    }
    if !order_by.is_empty() {
        sql.push_str("\nORDER BY ");
        sql.push_str(&order_by.join(", "));
    }
    if let Some(limit) = query.limit {
        sql.push_str(&format!("\nLIMIT {limit}"));
    }

    Ok(QueryPlan { sql, columns })
}

fn resolve_for_all<'a>(metrics: &[&'a CompiledMetric], name: &str) -> Option<&'a ResolvedDimension> {
    let (first, rest) = metrics.split_first()?;
    let dim = first.dimension(name)?;
    rest.iter().all(|m| m.dimension(name).is_some()).then_some(dim)
}

/// `name`, or `name__<grain>` when `name` alone does not resolve.
fn resolve_grained<'a, 'n>(
    metrics: &[&'a CompiledMetric],
    name: &'n str,
) -> Option<(&'a ResolvedDimension, Option<&'n str>)> {
    if let Some(dim) = resolve_for_all(metrics, name) {
        return Some((dim, None));
    }
    let (base, grain) = name.rsplit_once("__")?;
    Grain::parse(grain)?;
    resolve_for_all(metrics, base).map(|dim| (dim, Some(grain)))
}

/// Time granularities, finest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Grain {
    Hour,
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl Grain {
    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "hour" => Some(Grain::Hour),
            "day" => Some(Grain::Day),
            "week" => Some(Grain::Week),
            "month" => Some(Grain::Month),
            "quarter" => Some(Grain::Quarter),
            "year" => Some(Grain::Year),
            _ => None,
        }
    }

    /// SQLite expression truncating `expr` to the start of its period.
    /// Weeks start on Monday.
    fn truncate(self, expr: &str) -> String {
        match self {
            Grain::Hour => format!("strftime('%Y-%m-%d %H:00:00', {expr})"),
            Grain::Day => format!("date({expr})"),
            Grain::Week => format!("date({expr}, 'weekday 0', '-6 days')"),
            Grain::Month => format!("date({expr}, 'start of month')"),
            Grain::Quarter => format!(
                "date({expr}, 'start of month', printf('-%d months', (CAST(strftime('%m', {expr}) AS INTEGER) - 1) % 3))"
            ),
            Grain::Year => format!("date({expr}, 'start of year')"),
        }
    }
}

impl fmt::Display for Grain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Grain::Hour => "hour",
            Grain::Day => "day",
            Grain::Week => "week",
            Grain::Month => "month",
            Grain::Quarter => "quarter",
            Grain::Year => "year",
        })
    }
}

/// Truncate a time dimension's column to `grain`; no grain, or the native one,
/// leaves the column untouched.
fn apply_grain(dim: &ResolvedDimension, expr: String, grain: Option<&str>) -> Result<String, EngineError> {
    let Some(raw) = grain else { return Ok(expr) };
    if dim.descriptor.dimension_type != DimensionType::Time {
        return Err(EngineError::Invalid(format!(
            "`{}` is not a time dimension and has no `{raw}` granularity",
            dim.qualified_name
        )));
    }
    let grain = Grain::parse(raw)
        .ok_or_else(|| EngineError::Invalid(format!("unknown time granularity `{raw}`")))?;
    let native = dim
        .descriptor
        .time_granularity
        .as_deref()
        .and_then(Grain::parse)
        .unwrap_or(Grain::Day);
    if grain < native {
        return Err(EngineError::Invalid(format!(
            "`{}` has {native} granularity and cannot be queried by {grain}",
            dim.qualified_name
        )));
    }
    if grain == native {
        return Ok(expr);
    }
    Ok(grain.truncate(&expr))
}

/// Prefix bare column names with a table alias; leave SQL expressions alone.
fn qualify(alias: &str, expr: &str) -> String {
    if !expr.is_empty() && expr.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        format!("{alias}.{expr}")
    } else {
        expr.to_string()
    }
}

/// Joins required so far, keyed by entity name.
#[derive(Default)]
struct JoinSet {
    by_entity: BTreeMap<String, usize>,
}

impl JoinSet {
    fn alias(entity: &str) -> String {
        format!("{entity}_src")
    }

    fn column_expr(&mut self, catalog: &SemanticCatalog, dim: &ResolvedDimension) -> Result<String, EngineError> {
        match &dim.source {
            DimensionSource::Local | DimensionSource::MetricTime => Ok(qualify(BASE_ALIAS, &dim.column)),
            DimensionSource::Joined { entity, model } => {
                if catalog.model(*model).is_none() {
                    return Err(EngineError::Invalid(format!("semantic model #{model} is missing")));
                }
                self.by_entity.insert(entity.clone(), *model);
                Ok(qualify(&Self::alias(entity), &dim.column))
            }
        }
    }

    fn render(&self, catalog: &SemanticCatalog, home: &crate::manifest::SemanticModel) -> Vec<String> {
        let mut out = Vec::new();
        for (entity, idx) in &self.by_entity {
            let (Some(other), Some(fk)) = (catalog.model(*idx), home.entity(entity)) else {
                continue;
            };
            let Some(pk) = other.entity(entity) else { continue };
            let alias = Self::alias(entity);
            out.push(format!(
                "LEFT OUTER JOIN {} AS {alias} ON {} = {}",
                other.node_relation.sql_relation(),
                qualify(BASE_ALIAS, fk.column()),
                qualify(&alias, pk.column()),
            ));
        }
        out
    }
}

/// Expand `{{ Dimension('x') }}`, `{{ TimeDimension('x', 'grain') }}` and
/// `{{ Entity('x') }}` references; the remaining text passes through verbatim.
fn render_filter(
    raw: &str,
    catalog: &SemanticCatalog,
    metrics: &[&CompiledMetric],
    home: &crate::manifest::SemanticModel,
    joins: &mut JoinSet,
) -> Result<String, EngineError> {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find("}}")
            .ok_or_else(|| EngineError::Invalid(format!("unterminated template in filter: {raw}")))?;
        let call = after[..end].trim();
        let (func, args) = parse_call(call)
            .ok_or_else(|| EngineError::Invalid(format!("unable to parse filter template `{call}`")))?;
        let name = args
            .first()
            .ok_or_else(|| EngineError::Invalid(format!("filter template `{call}` needs a name")))?;
        let expr = match func {
            "Dimension" | "TimeDimension" => {
                let (dim, suffix) = resolve_grained(metrics, name).ok_or_else(|| {
                    EngineError::Invalid(format!("filter references unknown dimension `{name}`"))
                })?;
                let grain = match func {
                    "TimeDimension" => args.get(1).map(String::as_str).or(suffix),
                    _ => suffix,
                };
                let column = joins.column_expr(catalog, dim)?;
                apply_grain(dim, column, grain)?
            }
            "Entity" => {
                let entity = home
                    .entity(name)
                    .ok_or_else(|| EngineError::Invalid(format!("filter references unknown entity `{name}`")))?;
                qualify(BASE_ALIAS, entity.column())
            }
            other => {
                return Err(EngineError::Invalid(format!("unsupported filter template `{other}`")));
            }
        };
        out.push_str(&expr);
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

/// `Name('a', "b")` -> (`Name`, [`a`, `b`])
fn parse_call(call: &str) -> Option<(&str, Vec<String>)> {
    let open = call.find('(')?;
    let inner = call[open + 1..].strip_suffix(')')?;
    let func = call[..open].trim();
    let args = inner
        .split(',')
        .map(|a| a.trim().trim_matches(|c| c == '\'' || c == '"').to_string())
        .filter(|a| !a.is_empty())
        .collect();
    Some((func, args))
}
