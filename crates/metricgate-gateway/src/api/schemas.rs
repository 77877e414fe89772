//! Request and response bodies.
//!
//! Response shapes follow the dbt Semantic Layer SDK so existing clients can
//! point at this server unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use metricgate_core::model::{CellValue, DataTable, DimensionDescriptor, DimensionType, MetricDescriptor, MetricQuery};

const METRIC_TIME: &str = "metric_time";

#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequest {
    pub metrics: Vec<String>,
    #[serde(default)]
    pub group_by: Option<Vec<String>>,
    #[serde(default, rename = "where")]
    pub where_: Option<Vec<String>>,
    #[serde(default)]
    pub order_by: Option<Vec<String>>,
    #[serde(default)]
    pub limit: Option<u64>,
}

impl From<QueryRequest> for MetricQuery {
    fn from(req: QueryRequest) -> Self {
        MetricQuery {
            metric_names: req.metrics,
            group_by_names: req.group_by.unwrap_or_default(),
            where_constraints: req.where_.unwrap_or_default(),
            order_by_names: req.order_by.unwrap_or_default(),
            limit: req.limit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaInfo {
    pub fields: Vec<SchemaField>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub sql: String,
    pub schema_info: SchemaInfo,
    /// Column name -> values, in result column order.
    pub data: Map<String, Value>,
}

impl QueryResponse {
    /// Pivot a row-oriented table into columns and infer a type per column.
    pub fn from_table(sql: String, table: &DataTable) -> Self {
        let mut columns: Vec<Vec<Value>> = vec![Vec::with_capacity(table.row_count()); table.column_names.len()];
        for row in &table.rows {
            for (column, cell) in columns.iter_mut().zip(row) {
                column.push(serialize_cell(cell));
            }
        }

        let fields = table
            .column_names
            .iter()
            .zip(&columns)
            .map(|(name, values)| SchemaField {
                name: name.clone(),
                field_type: infer_type(values),
            })
            .collect();

        let data = table
            .column_names
            .iter()
            .cloned()
            .zip(columns.into_iter().map(Value::Array))
            .collect();

        Self {
            sql,
            schema_info: SchemaInfo { fields },
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionResponse {
    pub name: String,
    pub qualified_name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub dimension_type: String,
    pub label: Option<String>,
    pub queryable_time_granularities: Vec<String>,
}

impl From<&DimensionDescriptor> for DimensionResponse {
    fn from(d: &DimensionDescriptor) -> Self {
        let queryable_time_granularities = match (d.dimension_type, &d.time_granularity) {
            (DimensionType::Time, Some(g)) => vec![g.clone()],
            _ => Vec::new(),
        };
        Self {
            name: d.name.clone(),
            qualified_name: d.qualified_name.clone(),
            description: d.description.clone(),
            dimension_type: d.dimension_type.to_string(),
            label: d.label.clone(),
            queryable_time_granularities,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricResponse {
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub metric_type: String,
    pub label: Option<String>,
    pub requires_metric_time: bool,
    pub queryable_time_granularities: Vec<String>,
    pub dimensions: Vec<DimensionResponse>,
}

impl From<&MetricDescriptor> for MetricResponse {
    fn from(m: &MetricDescriptor) -> Self {
        let dimensions: Vec<DimensionResponse> = m.dimensions.iter().map(DimensionResponse::from).collect();
        let metric_time: Vec<&DimensionResponse> =
            dimensions.iter().filter(|d| d.qualified_name == METRIC_TIME).collect();

        Self {
            name: m.name.clone(),
            description: m.description.clone(),
            metric_type: m.metric_type.to_string(),
            label: m.label.clone(),
            requires_metric_time: !metric_time.is_empty(),
            queryable_time_granularities: metric_time
                .iter()
                .flat_map(|d| d.queryable_time_granularities.iter().cloned())
                .collect(),
            dimensions,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

/// JSON-safe rendering of one cell. Decimals widen to `f64`, temporal values
/// become ISO-8601 text, non-finite floats become `null`.
pub fn serialize_cell(cell: &CellValue) -> Value {
    match cell {
        CellValue::Null => Value::Null,
        CellValue::Bool(b) => Value::Bool(*b),
        CellValue::Int(i) => Value::Number((*i).into()),
        CellValue::Float(f) => float(*f),
        CellValue::Decimal(text) => match text.trim().parse::<f64>() {
            Ok(f) => float(f),
            Err(_) => Value::String(text.clone()),
        },
        CellValue::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
        CellValue::DateTime(dt) => Value::String(dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
        CellValue::Text(s) => Value::String(s.clone()),
    }
}

fn float(f: f64) -> Value {
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

/// Type of the first non-null value; all-null columns are `"string"`.
pub fn infer_type(values: &[Value]) -> &'static str {
    match values.iter().find(|v| !v.is_null()) {
        Some(Value::Bool(_)) => "bool",
        Some(Value::Number(n)) if n.is_i64() || n.is_u64() => "int64",
        Some(Value::Number(_)) => "float64",
        _ => "string",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn datetime(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").unwrap()
    }

    #[test]
    fn decimal_widens_to_float() {
        let v = serialize_cell(&CellValue::Decimal("3.14".into()));
        assert!((v.as_f64().unwrap() - 3.14).abs() < 1e-9);
    }

    #[test]
    fn temporal_values_are_iso_8601() {
        assert_eq!(
            serialize_cell(&CellValue::DateTime(datetime("2024-01-15T12:00:00"))),
            Value::String("2024-01-15T12:00:00".into())
        );
        assert_eq!(
            serialize_cell(&CellValue::DateTime(datetime("2024-01-15T12:00:00.250"))),
            Value::String("2024-01-15T12:00:00.250".into())
        );
        assert_eq!(
            serialize_cell(&CellValue::Date(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap())),
            Value::String("2024-01-15".into())
        );
    }

    #[test]
    fn null_and_non_finite_stay_null() {
        assert_eq!(serialize_cell(&CellValue::Null), Value::Null);
        assert_eq!(serialize_cell(&CellValue::Float(f64::NAN)), Value::Null);
    }

    #[test]
    fn inferred_type_skips_leading_nulls() {
        assert_eq!(infer_type(&[Value::Null, Value::from(1)]), "int64");
        assert_eq!(infer_type(&[Value::from(1.5)]), "float64");
        assert_eq!(infer_type(&[Value::Null, Value::Bool(true)]), "bool");
        assert_eq!(infer_type(&[Value::from("x")]), "string");
        assert_eq!(infer_type(&[Value::Null, Value::Null]), "string");
        assert_eq!(infer_type(&[]), "string");
    }

    #[test]
    fn table_pivots_to_columns() {
        let mut table = DataTable::new(vec!["city".into(), "revenue".into()]);
        table.push_row(vec![CellValue::Text("Paris".into()), CellValue::Float(1234.56)]);
        table.push_row(vec![CellValue::Text("Lyon".into()), CellValue::Null]);

        let resp = QueryResponse::from_table("SELECT 1".into(), &table);
        let keys: Vec<&String> = resp.data.keys().collect();
        assert_eq!(keys, ["city", "revenue"]);
        assert_eq!(resp.data["revenue"], serde_json::json!([1234.56, null]));
        assert_eq!(resp.schema_info.fields[1].field_type, "float64");
    }
}
