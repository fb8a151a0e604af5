use async_trait::async_trait;
use color_eyre::eyre::Result;
use serde::{Deserialize, Serialize};

use crate::value::Value;

/// One database exposed by the remote process. The driver assigns ids
/// 1-based in stable order, so the id doubles as a stable index into the
/// id-sorted list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseEntry {
  pub id: i64,
  pub name: String,
  pub tables: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDataRequest {
  pub database_id: i64,
  pub table: String,
  pub start: u64,
  pub count: u64,
  pub order: Option<String>,
  pub reverse: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDataResponse {
  pub columns: Vec<String>,
  pub values: Vec<Vec<Value>>,
  pub start: u64,
  pub count: u64,
  pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableStructureRequest {
  pub database_id: i64,
  pub table: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableStructureResponse {
  pub structure_columns: Vec<String>,
  pub structure_values: Vec<Vec<Value>>,
  pub indexes_columns: Vec<String>,
  pub indexes_values: Vec<Vec<Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableInfoRequest {
  pub database_id: i64,
  pub table: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableInfoResponse {
  pub definition: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteRequest {
  pub database_id: i64,
  pub value: String,
}

/// The remote reports which of the three statement shapes it ran; exactly
/// one outcome is populated per response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExecuteResponse {
  Select { columns: Vec<String>, values: Vec<Vec<Value>> },
  Insert { inserted_id: i64 },
  UpdateDelete { affected_count: u64 },
}

/// Request/response surface of the remote side. The engine depends only on
/// this contract; the transport behind it is a collaborator.
#[async_trait]
pub trait DatabaseDriver: Send + Sync {
  async fn database_list(&self) -> Result<Vec<DatabaseEntry>>;
  async fn get_table_data(&self, request: TableDataRequest) -> Result<TableDataResponse>;
  async fn get_table_structure(&self, request: TableStructureRequest) -> Result<TableStructureResponse>;
  async fn get_table_info(&self, request: TableInfoRequest) -> Result<TableInfoResponse>;
  async fn execute(&self, request: ExecuteRequest) -> Result<ExecuteResponse>;
}
