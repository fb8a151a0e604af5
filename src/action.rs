use serde::{Deserialize, Serialize};
use strum::Display;

use crate::{
  edit::RowEdit,
  orchestrator::ResourceKind,
  protocol::DatabaseEntry,
  store::models::{FetchKey, Page, QueryResult, SortOrder, Structure, ViewMode},
  value::Value,
};

/// Everything that can happen to the session: user intents plus the keyed
/// response merges that resolved fetches reduce to.
#[derive(Debug, Clone, PartialEq, Serialize, Display, Deserialize)]
pub enum Action {
  Refresh,
  SelectDatabase(i64),
  SelectTable(String),
  SetViewMode(ViewMode),
  NextPage,
  PreviousPage,
  GoToRow(i64),
  SortBy(Option<SortOrder>),
  UpdateQuery(String),
  ToggleFavorite,
  ExecuteQuery,
  HighlightRow(usize),
  ApplyRowEdit(RowEdit),
  DatabasesLoaded(Vec<DatabaseEntry>),
  PageLoaded(FetchKey, Page),
  StructureLoaded(FetchKey, Structure),
  TableInfoLoaded(FetchKey, String),
  QuerySucceeded(QueryResult, u64),
  QueryFailed(String),
  FetchFailed { kind: ResourceKind, key: Option<FetchKey>, message: String },
  PagePatched { row: usize, cells: Vec<(usize, Value)> },
  Error(String),
}
