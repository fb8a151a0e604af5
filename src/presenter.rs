use crate::store::{QueryResult, SessionState, ViewMode};

/// Renderable grid handed to whatever draws the screen. Plain strings only;
/// the engine keeps no opinion about widgets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableView {
  pub title: String,
  pub columns: Vec<String>,
  pub rows: Vec<Vec<String>>,
  pub highlighted: Vec<usize>,
}

/// Maps the state into the grid the active view mode owns: page data,
/// structure metadata, query results, the table definition, or history.
pub fn render(state: &SessionState) -> TableView {
  match state.view_mode {
    ViewMode::Data => render_page(state),
    ViewMode::Structure => render_structure(state),
    ViewMode::Sql => render_query_result(state),
    ViewMode::TableInfo => render_table_info(state),
    ViewMode::QueryHistory => render_history(state),
  }
}

/// Index metadata for the structure tab, rendered separately so the caller
/// can stack the two grids.
pub fn render_indexes(state: &SessionState) -> Option<TableView> {
  let structure = state.current_structure.as_ref()?;
  Some(TableView {
    title: format!("indexes of {}", structure.table),
    columns: structure.indexes_columns.clone(),
    rows: structure.indexes_values.iter().map(|row| row.iter().map(|v| v.render()).collect()).collect(),
    highlighted: vec![],
  })
}

fn render_page(state: &SessionState) -> TableView {
  let Some(page) = &state.current_page else {
    return placeholder(state, "no page loaded");
  };
  let end = page.start + page.count;
  TableView {
    title: format!("{} rows {}..{} of {}", page.table, page.start, end, page.total),
    columns: page.columns.clone(),
    rows: page.rows.iter().map(|row| row.iter().map(|v| v.render()).collect()).collect(),
    highlighted: page.highlighted_rows.clone(),
  }
}

fn render_structure(state: &SessionState) -> TableView {
  let Some(structure) = &state.current_structure else {
    return placeholder(state, "no structure loaded");
  };
  TableView {
    title: format!("structure of {}", structure.table),
    columns: structure.columns.clone(),
    rows: structure.rows.iter().map(|row| row.iter().map(|v| v.render()).collect()).collect(),
    highlighted: vec![],
  }
}

fn render_query_result(state: &SessionState) -> TableView {
  match &state.query_result {
    Some(QueryResult::Table { columns, rows, highlighted_rows }) => TableView {
      title: title_with_elapsed("query result", state),
      columns: columns.clone(),
      rows: rows.iter().map(|row| row.iter().map(|v| v.render()).collect()).collect(),
      highlighted: highlighted_rows.clone(),
    },
    Some(QueryResult::Inserted { id }) => TableView {
      title: title_with_elapsed("insert", state),
      columns: vec!["inserted_id".to_string()],
      rows: vec![vec![id.to_string()]],
      highlighted: vec![],
    },
    Some(QueryResult::Affected { count }) => TableView {
      title: title_with_elapsed("update/delete", state),
      columns: vec!["affected_count".to_string()],
      rows: vec![vec![count.to_string()]],
      highlighted: vec![],
    },
    None => placeholder(state, "no query executed"),
  }
}

fn render_table_info(state: &SessionState) -> TableView {
  let Some(info) = &state.table_info else {
    return placeholder(state, "no definition loaded");
  };
  TableView {
    title: format!("definition of {}", info.table),
    columns: vec!["definition".to_string()],
    rows: vec![vec![info.definition.clone()]],
    highlighted: vec![],
  }
}

fn render_history(state: &SessionState) -> TableView {
  TableView {
    title: "query history".to_string(),
    columns: vec!["time".to_string(), "query".to_string()],
    rows: state.query_history.iter().map(|q| vec![q.time.clone(), q.value.clone()]).collect(),
    highlighted: vec![],
  }
}

fn title_with_elapsed(label: &str, state: &SessionState) -> String {
  match state.execution_time_ms {
    Some(ms) => format!("{label} ({ms}ms)"),
    None => label.to_string(),
  }
}

fn placeholder(state: &SessionState, hint: &str) -> TableView {
  let title = match &state.error {
    Some(error) => format!("error: {error}"),
    None => hint.to_string(),
  };
  TableView { title, ..TableView::default() }
}
