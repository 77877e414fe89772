//! SQLite warehouse client.
//!
//! Each query opens its own read-only connection on the blocking pool, so the
//! client is freely shareable across engine snapshots and request tasks.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};

use metricgate_core::engine::WarehouseClient;
use metricgate_core::error::{EngineError, RootCause};
use metricgate_core::model::{CellValue, DataTable};

pub const ADAPTER_TYPE: &str = "sqlite";

#[derive(Debug, Clone)]
pub struct SqliteClient {
    path: PathBuf,
}

impl SqliteClient {
    /// Open the database once and run `SELECT 1` to prove it is usable.
    pub fn connect(path: &Path) -> Result<Self, rusqlite::Error> {
        let conn = open(path)?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(Self { path: path.to_path_buf() })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// SQLite reports the useful text on the outer error; its `source()` only
/// carries the numeric result code.
pub fn cause(err: &rusqlite::Error) -> RootCause {
    RootCause::new("SqliteError", err.to_string())
}

fn open(path: &Path) -> Result<Connection, rusqlite::Error> {
    Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX)
}

#[async_trait]
impl WarehouseClient for SqliteClient {
    fn adapter_type(&self) -> &str {
        ADAPTER_TYPE
    }

    async fn execute(&self, sql: &str) -> Result<DataTable, EngineError> {
        let path = self.path.clone();
        let sql = sql.to_string();
        let joined = tokio::task::spawn_blocking(move || run_query(&path, &sql)).await;
        match joined {
            Ok(Ok(table)) => Ok(table),
            Ok(Err(e)) => Err(EngineError::Execution(cause(&e))),
            Err(e) => Err(EngineError::Unexpected(RootCause::of(&e))),
        }
    }
}

fn run_query(path: &Path, sql: &str) -> Result<DataTable, rusqlite::Error> {
    let conn = open(path)?;
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(str::to_string).collect();
    // declared types let DATE / DATETIME / NUMERIC columns decode richer than their storage class
    let decl: Vec<Option<String>> = stmt
        .columns()
        .iter()
        .map(|c| c.decl_type().map(str::to_ascii_uppercase))
        .collect();

    let width = columns.len();
    let mut table = DataTable::new(columns);
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let mut cells = Vec::with_capacity(width);
        for idx in 0..width {
            let declared = decl.get(idx).and_then(|d| d.as_deref());
            cells.push(decode(row.get_ref(idx)?, declared)?);
        }
        table.push_row(cells);
    }
    Ok(table)
}

fn decode(value: ValueRef<'_>, declared: Option<&str>) -> Result<CellValue, rusqlite::Error> {
    let cell = match value {
        ValueRef::Null => CellValue::Null,
        ValueRef::Integer(v) => match declared {
            Some("BOOLEAN") | Some("BOOL") => CellValue::Bool(v != 0),
            _ => CellValue::Int(v),
        },
        ValueRef::Real(v) => match declared {
            Some(d) if d.starts_with("NUMERIC") || d.starts_with("DECIMAL") => CellValue::Decimal(v.to_string()),
            _ => CellValue::Float(v),
        },
        ValueRef::Text(bytes) => {
            let text = std::str::from_utf8(bytes).map_err(rusqlite::Error::Utf8Error)?;
            decode_text(text, declared)
        }
        ValueRef::Blob(bytes) => CellValue::Text(String::from_utf8_lossy(bytes).into_owned()),
    };
    Ok(cell)
}

fn decode_text(text: &str, declared: Option<&str>) -> CellValue {
    match declared {
        Some("DATE") => NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .map(CellValue::Date)
            .unwrap_or_else(|_| CellValue::Text(text.to_string())),
        Some("DATETIME") | Some("TIMESTAMP") => parse_datetime(text)
            .map(CellValue::DateTime)
            .unwrap_or_else(|| CellValue::Text(text.to_string())),
        Some(d) if d.starts_with("NUMERIC") || d.starts_with("DECIMAL") => CellValue::Decimal(text.to_string()),
        _ => CellValue::Text(text.to_string()),
    }
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
}
