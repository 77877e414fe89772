//! Value and descriptor types exchanged between the gateway and an engine.
//!
//! Everything here is plain data: the gateway never inspects a manifest or a
//! warehouse directly, it only sees what an engine hands back in these shapes.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// One cell of a warehouse result set.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Exact decimal in canonical text form (e.g. `"3.14"`), as reported for NUMERIC columns.
    Decimal(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Text(String),
}

/// Row-oriented result table as returned by a warehouse client.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataTable {
    pub column_names: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl DataTable {
    pub fn new(column_names: Vec<String>) -> Self {
        Self { column_names, rows: Vec::new() }
    }

    pub fn push_row(&mut self, row: Vec<CellValue>) {
        self.rows.push(row);
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Engine-side request shape for a metric query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricQuery {
    pub metric_names: Vec<String>,
    pub group_by_names: Vec<String>,
    pub where_constraints: Vec<String>,
    pub order_by_names: Vec<String>,
    pub limit: Option<u64>,
}

/// Successful query: the generated SQL plus its result.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub sql: String,
    pub table: DataTable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DimensionType {
    Categorical,
    Time,
}

impl fmt::Display for DimensionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DimensionType::Categorical => f.write_str("CATEGORICAL"),
            DimensionType::Time => f.write_str("TIME"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    Simple,
    Ratio,
    Cumulative,
    Derived,
    Conversion,
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MetricType::Simple => "SIMPLE",
            MetricType::Ratio => "RATIO",
            MetricType::Cumulative => "CUMULATIVE",
            MetricType::Derived => "DERIVED",
            MetricType::Conversion => "CONVERSION",
        };
        f.write_str(s)
    }
}

/// A dimension a metric can be grouped or filtered by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionDescriptor {
    pub name: String,
    /// Entity-qualified name used in queries (e.g. `location__location_name`).
    pub qualified_name: String,
    pub description: Option<String>,
    pub dimension_type: DimensionType,
    pub label: Option<String>,
    /// Native granularity of a time dimension.
    pub time_granularity: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDescriptor {
    pub name: String,
    pub description: Option<String>,
    pub metric_type: MetricType,
    pub label: Option<String>,
    pub dimensions: Vec<DimensionDescriptor>,
}
