use serde::{Deserialize, Serialize};
use strum::Display;

use crate::value::Value;

/// Rows fetched per page. Fixed by the pagination protocol.
pub const PAGE_SIZE: u64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrder {
    pub key: String,
    pub direction: SortDirection,
}

impl SortOrder {
    pub fn reverse(&self) -> bool {
        self.direction == SortDirection::Down
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum ViewMode {
    #[default]
    Data,
    Structure,
    Sql,
    TableInfo,
    QueryHistory,
}

/// One fetched window of a table. Never merged partially; a new page always
/// replaces the old one wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub database_id: i64,
    pub table: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub start: u64,
    pub count: u64,
    pub total: u64,
    pub highlighted_rows: Vec<usize>,
}

impl Page {
    pub fn key(&self) -> FetchKey {
        FetchKey { database_id: self.database_id, table: self.table.clone() }
    }
}

/// Column and index metadata for the selected table. The column-metadata
/// header names (`column_name`, `data_type`, `nullable`, `primary_key`) are
/// a contract with the remote metadata provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    pub database_id: i64,
    pub table: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub indexes_columns: Vec<String>,
    pub indexes_values: Vec<Vec<Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableInfo {
    pub database_id: i64,
    pub table: String,
    pub definition: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub value: String,
    pub time: String,
}

impl Query {
    /// Stamps the text with the current local time, the way submissions are
    /// recorded for history display.
    pub fn stamped(value: impl Into<String>) -> Self {
        Self { value: value.into(), time: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryResult {
    Table { columns: Vec<String>, rows: Vec<Vec<Value>>, highlighted_rows: Vec<usize> },
    Inserted { id: i64 },
    Affected { count: u64 },
}

/// Identifies which selection a fetch was issued for. Responses whose key no
/// longer matches the live selection are discarded instead of merged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FetchKey {
    pub database_id: i64,
    pub table: String,
}
