use std::{
    cmp::Ordering,
    collections::{HashMap, HashSet, VecDeque},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use color_eyre::eyre::{eyre, Result};
use db_scout::{
    favorites::FavoritesStore,
    protocol::{
        DatabaseDriver, DatabaseEntry, ExecuteRequest, ExecuteResponse, TableDataRequest, TableDataResponse,
        TableInfoRequest, TableInfoResponse, TableStructureRequest, TableStructureResponse,
    },
    store::Structure,
    value::Value,
};

pub struct FakeTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub structure: Option<TableStructureResponse>,
    pub definition: String,
}

/// Scripted in-memory driver: serves canned tables, records every call, and
/// fails on demand per method name.
#[derive(Default)]
pub struct FakeDriver {
    databases: Vec<(i64, String)>,
    tables: HashMap<(i64, String), FakeTable>,
    calls: Mutex<Vec<String>>,
    failures: Mutex<HashSet<String>>,
    execute_results: Mutex<VecDeque<ExecuteResponse>>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_database(mut self, id: i64, name: &str) -> Self {
        self.databases.push((id, name.to_string()));
        self
    }

    pub fn with_table(mut self, database_id: i64, name: &str, columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        self.tables.insert((database_id, name.to_string()), FakeTable {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
            structure: None,
            definition: format!("CREATE TABLE {name} (...)"),
        });
        self
    }

    pub fn with_structure(mut self, database_id: i64, table: &str, structure: &Structure) -> Self {
        if let Some(entry) = self.tables.get_mut(&(database_id, table.to_string())) {
            entry.structure = Some(TableStructureResponse {
                structure_columns: structure.columns.clone(),
                structure_values: structure.rows.clone(),
                indexes_columns: structure.indexes_columns.clone(),
                indexes_values: structure.indexes_values.clone(),
            });
        }
        self
    }

    pub fn fail(&self, method: &str) {
        self.failures.lock().unwrap().insert(method.to_string());
    }

    pub fn pass(&self, method: &str) {
        self.failures.lock().unwrap().remove(method);
    }

    pub fn push_execute_result(&self, response: ExecuteResponse) {
        self.execute_results.lock().unwrap().push_back(response);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn admit(&self, method: &str, detail: &str) -> Result<()> {
        self.calls.lock().unwrap().push(if detail.is_empty() {
            method.to_string()
        } else {
            format!("{method} {detail}")
        });
        if self.failures.lock().unwrap().contains(method) {
            return Err(eyre!("{method} failed"));
        }
        Ok(())
    }

    fn table(&self, database_id: i64, name: &str) -> Result<&FakeTable> {
        self.tables.get(&(database_id, name.to_string())).ok_or_else(|| eyre!("no table {name}"))
    }
}

#[async_trait]
impl DatabaseDriver for FakeDriver {
    async fn database_list(&self) -> Result<Vec<DatabaseEntry>> {
        self.admit("databaseList", "")?;
        Ok(self
            .databases
            .iter()
            .map(|(id, name)| {
                let mut tables: Vec<String> =
                    self.tables.keys().filter(|(db, _)| db == id).map(|(_, t)| t.clone()).collect();
                tables.sort();
                DatabaseEntry { id: *id, name: name.clone(), tables }
            })
            .collect())
    }

    async fn get_table_data(&self, request: TableDataRequest) -> Result<TableDataResponse> {
        self.admit(
            "getTableData",
            &format!("{} start={} order={:?} reverse={}", request.table, request.start, request.order, request.reverse),
        )?;
        let table = self.table(request.database_id, &request.table)?;

        let mut rows = table.rows.clone();
        if let Some(key) = &request.order {
            let at = table.columns.iter().position(|c| c == key).ok_or_else(|| eyre!("no column {key}"))?;
            rows.sort_by(|a, b| compare(&a[at], &b[at]));
            if request.reverse {
                rows.reverse();
            }
        }

        let total = rows.len() as u64;
        let start = request.start.min(total);
        let count = request.count.min(total - start);
        let values: Vec<Vec<Value>> = rows[start as usize..(start + count) as usize].to_vec();

        Ok(TableDataResponse { columns: table.columns.clone(), values, start, count, total })
    }

    async fn get_table_structure(&self, request: TableStructureRequest) -> Result<TableStructureResponse> {
        self.admit("getTableStructure", &request.table)?;
        let table = self.table(request.database_id, &request.table)?;
        Ok(table.structure.clone().unwrap_or_else(|| TableStructureResponse {
            structure_columns: ["column_name", "data_type", "nullable", "default_value", "primary_key"]
                .map(String::from)
                .to_vec(),
            structure_values: table
                .columns
                .iter()
                .map(|name| {
                    vec![
                        Value::String(name.clone()),
                        Value::String("TEXT".to_string()),
                        Value::Boolean(true),
                        Value::Null,
                        Value::Boolean(false),
                    ]
                })
                .collect(),
            indexes_columns: ["index_name", "unique", "columns"].map(String::from).to_vec(),
            indexes_values: vec![],
        }))
    }

    async fn get_table_info(&self, request: TableInfoRequest) -> Result<TableInfoResponse> {
        self.admit("getTableInfo", &request.table)?;
        let table = self.table(request.database_id, &request.table)?;
        Ok(TableInfoResponse { definition: table.definition.clone() })
    }

    async fn execute(&self, request: ExecuteRequest) -> Result<ExecuteResponse> {
        self.admit("execute", &request.value)?;
        Ok(self
            .execute_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ExecuteResponse::Select { columns: vec![], values: vec![] }))
    }
}

fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bigint(x), Value::Bigint(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        _ => a.render().cmp(&b.render()),
    }
}

/// Favorites storage that remembers every save for assertions.
#[derive(Default)]
pub struct MemoryFavorites {
    pub initial: Vec<String>,
    pub saved: Mutex<Vec<Vec<String>>>,
}

/// Local wrapper so an `Arc`-shared `MemoryFavorites` can implement the foreign
/// `FavoritesStore` trait without tripping the orphan rule.
pub struct SharedFavorites(pub Arc<MemoryFavorites>);

impl FavoritesStore for SharedFavorites {
    fn load(&self) -> Result<Vec<String>> {
        Ok(self.0.initial.clone())
    }

    fn save(&self, favorites: &[String]) -> Result<()> {
        self.0.saved.lock().unwrap().push(favorites.to_vec());
        Ok(())
    }
}
