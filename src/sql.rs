use std::path::{Path, PathBuf};

use async_trait::async_trait;
use color_eyre::eyre::{self, Result};
use sqlx::{sqlite::SqliteRow, Column, Row};
use tokio_stream::StreamExt;

use crate::{
  edit::quote_identifier,
  protocol::{
    DatabaseDriver, DatabaseEntry, ExecuteRequest, ExecuteResponse, TableDataRequest, TableDataResponse,
    TableInfoRequest, TableInfoResponse, TableStructureRequest, TableStructureResponse,
  },
  value::Value,
};

struct OpenDatabase {
  id: i64,
  name: String,
  pool: sqlx::SqlitePool,
}

/// `DatabaseDriver` over one or more SQLite files, one pool each. Database
/// ids are assigned 1-based in open order and stay stable for the lifetime
/// of the driver.
pub struct SqliteDriver {
  databases: Vec<OpenDatabase>,
}

impl SqliteDriver {
  pub async fn open(paths: &[PathBuf]) -> Result<Self> {
    let mut databases = vec![];
    for (index, path) in paths.iter().enumerate() {
      let pool = sqlx::SqlitePool::connect(&format!("sqlite:{}", path.display()))
        .await
        .map_err(|e| eyre::eyre!("Failed to connect to Sqlite: {}", e))?;
      databases.push(OpenDatabase { id: index as i64 + 1, name: database_name(path), pool });
    }
    Ok(Self { databases })
  }

  fn database(&self, id: i64) -> Result<&OpenDatabase> {
    self.databases.iter().find(|d| d.id == id).ok_or_else(|| eyre::eyre!("unknown database id {id}"))
  }
}

fn database_name(path: &Path) -> String {
  path.file_stem().map(|stem| stem.to_string_lossy().to_string()).unwrap_or_else(|| path.display().to_string())
}

#[async_trait]
impl DatabaseDriver for SqliteDriver {
  async fn database_list(&self) -> Result<Vec<DatabaseEntry>> {
    let mut entries = vec![];
    for database in &self.databases {
      let rows =
        sqlx::query(r#"SELECT name FROM sqlite_schema WHERE type = 'table' AND name NOT LIKE 'sqlite_%'"#)
          .fetch_all(&database.pool)
          .await?;

      let mut tables: Vec<String> =
        rows.into_iter().filter_map(|row| row.try_get::<String, _>("name").ok()).collect();
      tables.sort();

      entries.push(DatabaseEntry { id: database.id, name: database.name.clone(), tables });
    }
    Ok(entries)
  }

  async fn get_table_data(&self, request: TableDataRequest) -> Result<TableDataResponse> {
    let database = self.database(request.database_id)?;
    let table = quote_identifier(&request.table);

    let total: i64 =
      sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}")).fetch_one(&database.pool).await?;
    let total = total as u64;

    // Clamp the window so `start + count <= total` always holds on the
    // response, whatever offset the caller asked for.
    let start = request.start.min(total);
    let count = request.count.min(total - start);

    let order_clause = match &request.order {
      Some(key) => {
        let direction = if request.reverse { "DESC" } else { "ASC" };
        format!(" ORDER BY {} {}", quote_identifier(key), direction)
      },
      None => String::new(),
    };
    let data_query = format!("SELECT * FROM {table}{order_clause} LIMIT ? OFFSET ?");

    let mut columns = vec![];
    let mut values = vec![];
    let mut rows = sqlx::query(&data_query).bind(count as i64).bind(start as i64).fetch(&database.pool);
    while let Some(row) = rows.try_next().await? {
      if columns.is_empty() {
        columns = row.columns().iter().map(|c| c.name().to_string()).collect();
      }
      values.push((0..row.columns().len()).map(|i| cell_value(&row, i)).collect());
    }

    if columns.is_empty() {
      // An empty window still reports the table's column headers.
      columns = table_columns(&database.pool, &request.table).await?;
    }

    let count = values.len() as u64;
    Ok(TableDataResponse { columns, values, start, count, total })
  }

  async fn get_table_structure(&self, request: TableStructureRequest) -> Result<TableStructureResponse> {
    let database = self.database(request.database_id)?;

    let pragma_query = format!("PRAGMA table_info({})", quote_identifier(&request.table));
    let rows = sqlx::query(&pragma_query).fetch_all(&database.pool).await?;

    let structure_columns =
      ["column_name", "data_type", "nullable", "default_value", "primary_key"].map(String::from).to_vec();
    let mut structure_values = vec![];
    for row in rows {
      let name: String = row.try_get("name")?;
      let data_type: String = row.try_get("type")?;
      let not_null: i64 = row.try_get("notnull")?;
      let default: Option<String> = row.try_get("dflt_value")?;
      let pk: i64 = row.try_get("pk")?;
      structure_values.push(vec![
        Value::String(name),
        Value::String(data_type),
        Value::Boolean(not_null == 0),
        default.map(Value::String).unwrap_or(Value::Null),
        Value::Boolean(pk > 0),
      ]);
    }

    let indexes_columns = ["index_name", "unique", "columns"].map(String::from).to_vec();
    let mut indexes_values = vec![];
    let index_list = format!("PRAGMA index_list({})", quote_identifier(&request.table));
    for row in sqlx::query(&index_list).fetch_all(&database.pool).await? {
      let index_name: String = row.try_get("name")?;
      let unique: i64 = row.try_get("unique")?;

      let index_info = format!("PRAGMA index_info({})", quote_identifier(&index_name));
      let members: Vec<String> = sqlx::query(&index_info)
        .fetch_all(&database.pool)
        .await?
        .into_iter()
        .filter_map(|member| member.try_get::<Option<String>, _>("name").ok().flatten())
        .collect();

      indexes_values.push(vec![
        Value::String(index_name),
        Value::Boolean(unique != 0),
        Value::String(members.join(",")),
      ]);
    }

    Ok(TableStructureResponse { structure_columns, structure_values, indexes_columns, indexes_values })
  }

  async fn get_table_info(&self, request: TableInfoRequest) -> Result<TableInfoResponse> {
    let database = self.database(request.database_id)?;
    let definition: Option<Option<String>> =
      sqlx::query_scalar(r#"SELECT sql FROM sqlite_schema WHERE name = ?"#)
        .bind(&request.table)
        .fetch_optional(&database.pool)
        .await?;
    Ok(TableInfoResponse { definition: definition.flatten().unwrap_or_default() })
  }

  async fn execute(&self, request: ExecuteRequest) -> Result<ExecuteResponse> {
    let database = self.database(request.database_id)?;
    let keyword =
      request.value.trim_start().split_whitespace().next().unwrap_or_default().to_lowercase();

    match keyword.as_str() {
      "select" | "with" | "pragma" | "explain" => {
        let mut columns = vec![];
        let mut values = vec![];
        let mut rows = sqlx::query(&request.value).fetch(&database.pool);
        while let Some(row) = rows.try_next().await? {
          if columns.is_empty() {
            columns = row.columns().iter().map(|c| c.name().to_string()).collect();
          }
          values.push((0..row.columns().len()).map(|i| cell_value(&row, i)).collect());
        }
        Ok(ExecuteResponse::Select { columns, values })
      },
      "insert" => {
        let result = sqlx::query(&request.value).execute(&database.pool).await?;
        Ok(ExecuteResponse::Insert { inserted_id: result.last_insert_rowid() })
      },
      _ => {
        let result = sqlx::query(&request.value).execute(&database.pool).await?;
        Ok(ExecuteResponse::UpdateDelete { affected_count: result.rows_affected() })
      },
    }
  }
}

async fn table_columns(pool: &sqlx::SqlitePool, table: &str) -> Result<Vec<String>> {
  let pragma_query = format!("PRAGMA table_info({})", quote_identifier(table));
  let rows = sqlx::query(&pragma_query).fetch_all(pool).await?;
  Ok(rows.into_iter().filter_map(|row| row.try_get::<String, _>("name").ok()).collect())
}

/// Decodes one cell into the uniform value model, trying the SQLite storage
/// classes in affinity order.
fn cell_value(row: &SqliteRow, index: usize) -> Value {
  if let Ok(value) = row.try_get::<Option<i64>, _>(index) {
    return value.map_or(Value::Null, Value::Bigint);
  }
  if let Ok(value) = row.try_get::<Option<f64>, _>(index) {
    return value.map_or(Value::Null, Value::Number);
  }
  if let Ok(value) = row.try_get::<Option<String>, _>(index) {
    return value.map_or(Value::Null, Value::String);
  }
  if let Ok(value) = row.try_get::<Option<Vec<u8>>, _>(index) {
    return value.map_or(Value::Null, Value::Bytes);
  }
  Value::Unknown(format!("<{}>", row.column(index).name()))
}
