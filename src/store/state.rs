use serde::{Deserialize, Serialize};

use super::models::{FetchKey, Page, Query, QueryResult, SortOrder, Structure, TableInfo, ViewMode, PAGE_SIZE};
use crate::{action::Action, protocol::DatabaseEntry, value::Value};

/// The one mutable value of the session. Everything the view model knows
/// lives here; transitions are pure functions from the previous snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub databases: Vec<DatabaseEntry>,
    pub selected_database: Option<i64>,
    pub selected_table: Option<String>,
    pub view_mode: ViewMode,
    pub page_row_number: u64,
    pub current_sort: Option<SortOrder>,
    pub current_page: Option<Page>,
    pub current_structure: Option<Structure>,
    pub table_info: Option<TableInfo>,
    pub query: Option<Query>,
    pub query_result: Option<QueryResult>,
    pub query_history: Vec<Query>,
    pub favorites: Vec<String>,
    pub error: Option<String>,
    pub outdated_database_list: bool,
    pub execution_time_ms: Option<u64>,
}

impl SessionState {
    /// Computes the successor state for an action. Response merges carry the
    /// key they were fetched under and reduce to a no-op when that key no
    /// longer matches the live selection.
    pub fn reduce(&self, action: &Action) -> SessionState {
        match action {
            Action::Refresh => self.refresh(),
            Action::SelectDatabase(id) => self.select_database(*id),
            Action::SelectTable(name) => self.select_table(name),
            Action::SetViewMode(mode) => self.set_view_mode(*mode),
            Action::NextPage => self.paged(self.page_row_number + PAGE_SIZE),
            Action::PreviousPage => self.paged(self.page_row_number.saturating_sub(PAGE_SIZE)),
            Action::GoToRow(row) => self.go_to_row(*row),
            Action::SortBy(order) => self.sort_by(order.clone()),
            Action::UpdateQuery(text) => self.update_query(text),
            Action::ToggleFavorite => self.toggle_favorite(),
            Action::ExecuteQuery => self.record_submission(),
            Action::HighlightRow(row) => self.highlight_row(*row),
            Action::DatabasesLoaded(list) => self.update_databases(list),
            Action::PageLoaded(key, page) => self.merge_page(key, page),
            Action::StructureLoaded(key, structure) => self.merge_structure(key, structure),
            Action::TableInfoLoaded(key, definition) => self.merge_table_info(key, definition),
            Action::QuerySucceeded(result, elapsed_ms) => self.merge_query_result(result, *elapsed_ms),
            Action::QueryFailed(message) => self.with_error(message),
            Action::FetchFailed { message, .. } => self.with_error(message),
            Action::PagePatched { row, cells } => self.patch_page(*row, cells),
            Action::Error(message) => self.with_error(message),
            Action::ApplyRowEdit(_) => self.clone(),
        }
    }

    fn matches_selection(&self, key: &FetchKey) -> bool {
        self.selected_database == Some(key.database_id)
            && self.selected_table.as_deref() == Some(key.table.as_str())
    }

    /// Replaces the database list and re-derives both selections. Keeps the
    /// fetched page and sort only when the effective selection did not move.
    fn update_databases(&self, list: &[DatabaseEntry]) -> SessionState {
        let mut databases = list.to_vec();
        databases.sort_by_key(|d| d.id);

        let selected_database = self.selected_database.or_else(|| databases.first().map(|d| d.id));
        let tables = selected_database
            .and_then(|id| databases.iter().find(|d| d.id == id))
            .map(|d| d.tables.as_slice())
            .unwrap_or(&[]);
        let selected_table = self
            .selected_table
            .clone()
            .filter(|t| tables.iter().any(|name| name == t))
            .or_else(|| tables.first().cloned());

        let same_table_selected =
            selected_database == self.selected_database && selected_table == self.selected_table;

        let mut next = self.clone();
        next.databases = databases;
        next.selected_database = selected_database;
        next.selected_table = selected_table;
        next.outdated_database_list = false;
        if !same_table_selected {
            next.page_row_number = 0;
            next.current_page = None;
            next.current_structure = None;
            next.current_sort = None;
        }
        next
    }

    fn select_database(&self, id: i64) -> SessionState {
        let mut next = self.clone();
        next.selected_database = Some(id);
        next.selected_table =
            self.databases.iter().find(|d| d.id == id).and_then(|d| d.tables.first().cloned());
        next.page_row_number = 0;
        next.current_page = None;
        next.current_structure = None;
        next.current_sort = None;
        next
    }

    fn select_table(&self, name: &str) -> SessionState {
        let mut next = self.clone();
        next.selected_table = Some(name.to_string());
        next.page_row_number = 0;
        next.current_page = None;
        next.current_structure = None;
        // sort is table-scoped, never carried across tables
        next.current_sort = None;
        next
    }

    fn set_view_mode(&self, mode: ViewMode) -> SessionState {
        let mut next = self.clone();
        next.view_mode = mode;
        next.error = None;
        next
    }

    fn paged(&self, row: u64) -> SessionState {
        let mut next = self.clone();
        next.page_row_number = row;
        next.current_page = None;
        next
    }

    /// Clamps into `[0, max(total - PAGE_SIZE, 0)]` against the loaded
    /// page's total. Without a loaded page there is nothing to clamp to.
    fn go_to_row(&self, row: i64) -> SessionState {
        let Some(page) = &self.current_page else {
            return self.clone();
        };
        let max = page.total.saturating_sub(PAGE_SIZE);
        self.paged((row.max(0) as u64).min(max))
    }

    fn sort_by(&self, order: Option<SortOrder>) -> SessionState {
        let mut next = self.clone();
        next.current_sort = order;
        next.page_row_number = 0;
        next.current_page = None;
        next
    }

    /// Marks the table list outdated and drops the page. Structure is
    /// considered stable across a manual refresh.
    fn refresh(&self) -> SessionState {
        let mut next = self.clone();
        next.outdated_database_list = true;
        next.current_page = None;
        next
    }

    fn update_query(&self, text: &str) -> SessionState {
        let mut next = self.clone();
        next.query = Some(Query::stamped(text));
        next
    }

    fn toggle_favorite(&self) -> SessionState {
        let Some(query) = self.query.as_ref().filter(|q| !q.value.is_empty()) else {
            return self.clone();
        };
        let mut next = self.clone();
        if let Some(at) = next.favorites.iter().position(|f| *f == query.value) {
            next.favorites.remove(at);
        } else {
            next.favorites.push(query.value.clone());
        }
        next
    }

    /// History records every submission, re-stamped at submission time,
    /// whether or not the execution later succeeds.
    fn record_submission(&self) -> SessionState {
        let Some(query) = self.query.as_ref().filter(|q| !q.value.is_empty()) else {
            return self.clone();
        };
        let stamped = Query::stamped(query.value.clone());
        let mut next = self.clone();
        next.query = Some(stamped.clone());
        next.query_history.push(stamped);
        next
    }

    fn highlight_row(&self, row: usize) -> SessionState {
        let mut next = self.clone();
        if let Some(page) = next.current_page.as_mut() {
            if row < page.rows.len() {
                page.highlighted_rows = vec![row];
            }
        }
        next
    }

    fn merge_page(&self, key: &FetchKey, page: &Page) -> SessionState {
        if !self.matches_selection(key) {
            return self.clone();
        }
        let mut next = self.clone();
        next.current_page = Some(Page { highlighted_rows: vec![], ..page.clone() });
        next.error = None;
        next
    }

    fn merge_structure(&self, key: &FetchKey, structure: &Structure) -> SessionState {
        if !self.matches_selection(key) {
            return self.clone();
        }
        let mut next = self.clone();
        next.current_structure = Some(structure.clone());
        next.error = None;
        next
    }

    fn merge_table_info(&self, key: &FetchKey, definition: &str) -> SessionState {
        if !self.matches_selection(key) {
            return self.clone();
        }
        let mut next = self.clone();
        next.table_info = Some(TableInfo {
            database_id: key.database_id,
            table: key.table.clone(),
            definition: definition.to_string(),
        });
        next.error = None;
        next
    }

    fn merge_query_result(&self, result: &QueryResult, elapsed_ms: u64) -> SessionState {
        let mut next = self.clone();
        next.query_result = Some(result.clone());
        next.execution_time_ms = Some(elapsed_ms);
        next.error = None;
        next
    }

    fn with_error(&self, message: &str) -> SessionState {
        let mut next = self.clone();
        next.error = Some(message.to_string());
        next
    }

    /// Optimistic local patch from the update builder: overwrite the edited
    /// cells of the highlighted row ahead of the remote round trip.
    fn patch_page(&self, row: usize, cells: &[(usize, Value)]) -> SessionState {
        let mut next = self.clone();
        if let Some(page) = next.current_page.as_mut() {
            if let Some(target) = page.rows.get_mut(row) {
                for (column, value) in cells {
                    if let Some(cell) = target.get_mut(*column) {
                        *cell = value.clone();
                    }
                }
            }
        }
        next
    }
}
