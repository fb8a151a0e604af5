use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
  store::models::{Page, Structure},
  value::{self, Value},
};

// Header names the remote metadata provider uses for structure rows. A
// documented contract, not something inferred from shape.
const COLUMN_NAME: &str = "column_name";
const DATA_TYPE: &str = "data_type";
const NULLABLE: &str = "nullable";
const PRIMARY_KEY: &str = "primary_key";

/// A cell-level edit of the highlighted row: column name to new text, with
/// `None` meaning the user cleared the cell to NULL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowEdit {
  pub changes: BTreeMap<String, Option<String>>,
}

impl RowEdit {
  pub fn set(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
    self.changes.insert(column.into(), Some(value.into()));
    self
  }

  pub fn clear(mut self, column: impl Into<String>) -> Self {
    self.changes.insert(column.into(), None);
    self
  }
}

/// The statement to send plus the optimistic local patch to apply while it
/// is in flight.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdatePlan {
  pub statement: String,
  pub row: usize,
  pub cells: Vec<(usize, Value)>,
}

struct ColumnMeta {
  data_type: String,
  nullable: bool,
}

/// Reconstructs a primary-key-scoped UPDATE from the structure metadata, the
/// highlighted row's pre-edit values, and the user's edit. Returns None when
/// no safe statement can be built; individual cells that fail coercion are
/// skipped, not fatal.
pub fn build_update(page: &Page, structure: &Structure, edit: &RowEdit) -> Option<UpdatePlan> {
  if page.highlighted_rows.len() != 1 {
    tracing::debug!(highlighted = page.highlighted_rows.len(), "row edit needs exactly one highlighted row");
    return None;
  }
  if edit.changes.is_empty() {
    return None;
  }
  let row_index = page.highlighted_rows[0];
  let row = page.rows.get(row_index)?;

  let locate = |name: &str| structure.columns.iter().position(|c| c == name);
  let (Some(pk_at), Some(name_at), Some(type_at)) = (locate(PRIMARY_KEY), locate(COLUMN_NAME), locate(DATA_TYPE))
  else {
    tracing::error!(table = %structure.table, "structure metadata is missing primary_key/column_name/data_type");
    return None;
  };
  let nullable_at = locate(NULLABLE);

  // Primary-key columns, resolved to their position in the page. Names the
  // page does not carry are dropped rather than crashing on a
  // structure/page mismatch.
  let mut key_columns: Vec<(String, usize)> = vec![];
  for meta_row in &structure.rows {
    if meta_row.get(pk_at).and_then(Value::as_bool) != Some(true) {
      continue;
    }
    let Some(name) = meta_row.get(name_at).and_then(Value::as_str) else {
      continue;
    };
    match page.columns.iter().position(|c| c == name) {
      Some(at) => key_columns.push((name.to_string(), at)),
      None => tracing::warn!(column = name, "primary-key column missing from page, dropping from predicate"),
    }
  }
  if key_columns.is_empty() {
    tracing::error!(table = %structure.table, "no usable primary-key columns, refusing to build UPDATE");
    return None;
  }

  let mut metadata: BTreeMap<String, ColumnMeta> = BTreeMap::new();
  for meta_row in &structure.rows {
    let Some(name) = meta_row.get(name_at).and_then(Value::as_str) else {
      continue;
    };
    let Some(data_type) = meta_row.get(type_at).and_then(Value::as_str) else {
      continue;
    };
    // Nullability defaults to true unless the structure explicitly reports
    // false (or the metadata column is absent altogether).
    let nullable = nullable_at
      .and_then(|at| meta_row.get(at))
      .and_then(Value::as_bool)
      .unwrap_or(true);
    metadata.insert(name.to_string(), ColumnMeta { data_type: data_type.to_string(), nullable });
  }

  let mut assignments: Vec<String> = vec![];
  let mut cells: Vec<(usize, Value)> = vec![];
  for (column, input) in &edit.changes {
    let Some(meta) = metadata.get(column) else {
      tracing::error!(column = %column, "edited column has no structure metadata, skipping");
      continue;
    };
    let Some(page_at) = page.columns.iter().position(|c| c == column) else {
      tracing::error!(column = %column, "edited column missing from page, skipping");
      continue;
    };
    match value::coerce(input.as_deref(), &meta.data_type, meta.nullable) {
      Ok(coerced) => {
        assignments.push(format!("{} = {}", quote_identifier(column), coerced.to_sql_literal()));
        cells.push((page_at, coerced));
      },
      Err(e) => tracing::error!(column = %column, "cannot coerce edited value: {e}"),
    }
  }
  if assignments.is_empty() {
    tracing::error!(table = %structure.table, "every edited field failed coercion, no UPDATE emitted");
    return None;
  }

  // The WHERE clause pins the row by its pre-edit key values, read from the
  // page snapshot rather than the edit.
  let predicates: Vec<String> = key_columns
    .iter()
    .map(|(name, at)| {
      let current = row.get(*at).cloned().unwrap_or(Value::Null);
      if current.is_null() {
        format!("{} IS NULL", quote_identifier(name))
      } else {
        format!("{} = {}", quote_identifier(name), current.to_sql_literal())
      }
    })
    .collect();

  let statement = format!(
    "UPDATE {} SET {} WHERE {}",
    quote_identifier(&page.table),
    assignments.join(", "),
    predicates.join(" AND "),
  );

  Some(UpdatePlan { statement, row: row_index, cells })
}

/// Double-quoted SQL identifier with embedded quotes doubled.
pub fn quote_identifier(name: &str) -> String {
  format!("\"{}\"", name.replace('"', "\"\""))
}
