use std::{sync::Arc, time::Instant};

use color_eyre::eyre::Result;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::{
  action::Action,
  edit::{self, RowEdit},
  favorites::FavoritesStore,
  orchestrator::{FetchTask, Orchestrator, ResourceKind},
  protocol::{
    DatabaseDriver, ExecuteRequest, ExecuteResponse, TableDataRequest, TableInfoRequest, TableStructureRequest,
  },
  store::{models::Page, QueryResult, SessionState, Store},
};

/// One inspection session: the store, the fetch orchestrator, the remote
/// driver and the favorites storage, tied together by an unbounded action
/// queue. Everything runs on one logical thread; overlap comes only from
/// request/response round trips, and a response is always applied against
/// the state current at arrival.
pub struct Session {
  store: Store,
  orchestrator: Orchestrator,
  driver: Arc<dyn DatabaseDriver>,
  favorites: Box<dyn FavoritesStore>,
  tx: UnboundedSender<Action>,
  rx: UnboundedReceiver<Action>,
}

impl Session {
  pub fn new(driver: Arc<dyn DatabaseDriver>, favorites: Box<dyn FavoritesStore>) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();

    let mut initial = SessionState::default();
    match favorites.load() {
      Ok(list) => initial.favorites = list,
      Err(e) => tracing::warn!("could not load favorites: {e}"),
    }

    let mut store = Store::new(initial);
    store.subscribe(|new, previous| {
      if new.selected_table != previous.selected_table {
        tracing::debug!(table = ?new.selected_table, "table selection changed");
      }
    });

    Self { store, orchestrator: Orchestrator::new(), driver, favorites, tx, rx }
  }

  pub fn state(&self) -> &SessionState {
    self.store.state()
  }

  /// Queue an action. Delivery happens on the next `run_until_idle`.
  pub fn dispatch(&self, action: Action) -> Result<()> {
    self.tx.send(action)?;
    Ok(())
  }

  /// Kicks off the initial database-list fetch and settles.
  pub async fn start(&mut self) -> Result<()> {
    self.dispatch(Action::Refresh)?;
    self.run_until_idle().await
  }

  /// Drains the action queue, including the merge actions enqueued by the
  /// fetches each step triggers, until nothing is left to do.
  pub async fn run_until_idle(&mut self) -> Result<()> {
    while let Ok(action) = self.rx.try_recv() {
      self.step(action).await?;
    }
    Ok(())
  }

  async fn step(&mut self, action: Action) -> Result<()> {
    log::debug!("{action:?}");

    // Settle in-flight bookkeeping before the reducer runs so a discarded
    // merge can never wedge its resource kind.
    match &action {
      Action::DatabasesLoaded(_) => self.orchestrator.settle(ResourceKind::DatabaseList, None),
      Action::PageLoaded(key, _) => self.orchestrator.settle(ResourceKind::Page, Some(key)),
      Action::StructureLoaded(key, _) => self.orchestrator.settle(ResourceKind::Structure, Some(key)),
      Action::TableInfoLoaded(key, _) => self.orchestrator.settle(ResourceKind::TableInfo, Some(key)),
      Action::FetchFailed { kind, key, .. } => self.orchestrator.settle(*kind, key.as_ref()),
      _ => {},
    }

    let previous = self.store.dispatch(&action);

    match &action {
      Action::ExecuteQuery => self.execute_current_query().await,
      Action::ApplyRowEdit(row_edit) => self.apply_row_edit(row_edit).await,
      Action::ToggleFavorite => {
        if let Err(e) = self.favorites.save(&self.store.state().favorites) {
          tracing::error!("could not persist favorites: {e}");
        }
      },
      _ => {},
    }

    // A failure merge leaves the guard empty on purpose; replanning off it
    // would hammer a failing remote. The retry happens on the next
    // qualifying transition instead.
    let failure = matches!(action, Action::FetchFailed { .. } | Action::QueryFailed(_) | Action::Error(_));
    if !failure {
      let tasks = self.orchestrator.plan(&previous, self.store.state());
      for task in tasks {
        self.run_fetch(task).await;
      }
    }
    Ok(())
  }

  async fn run_fetch(&mut self, task: FetchTask) {
    let kind = task.kind();
    let result = match task {
      FetchTask::DatabaseList => {
        self.driver.database_list().await.map(Action::DatabasesLoaded).map_err(|e| (None, e))
      },
      FetchTask::Page { key, start, count, order, reverse } => self
        .driver
        .get_table_data(TableDataRequest {
          database_id: key.database_id,
          table: key.table.clone(),
          start,
          count,
          order,
          reverse,
        })
        .await
        .map(|r| {
          Action::PageLoaded(key.clone(), Page {
            database_id: key.database_id,
            table: key.table.clone(),
            columns: r.columns,
            rows: r.values,
            start: r.start,
            count: r.count,
            total: r.total,
            highlighted_rows: vec![],
          })
        })
        .map_err(|e| (Some(key), e)),
      FetchTask::Structure { key } => self
        .driver
        .get_table_structure(TableStructureRequest { database_id: key.database_id, table: key.table.clone() })
        .await
        .map(|r| {
          Action::StructureLoaded(key.clone(), crate::store::Structure {
            database_id: key.database_id,
            table: key.table.clone(),
            columns: r.structure_columns,
            rows: r.structure_values,
            indexes_columns: r.indexes_columns,
            indexes_values: r.indexes_values,
          })
        })
        .map_err(|e| (Some(key), e)),
      FetchTask::TableInfo { key } => self
        .driver
        .get_table_info(TableInfoRequest { database_id: key.database_id, table: key.table.clone() })
        .await
        .map(|r| Action::TableInfoLoaded(key.clone(), r.definition))
        .map_err(|e| (Some(key), e)),
    };

    let action = match result {
      Ok(action) => action,
      Err((key, e)) => Action::FetchFailed { kind, key, message: e.to_string() },
    };
    if let Err(e) = self.tx.send(action) {
      tracing::error!("could not enqueue fetch result: {e}");
    }
  }

  /// Sends the current query buffer to the remote side and merges whichever
  /// of the three outcomes it reports. The history append already happened
  /// in the reducer, success or not.
  async fn execute_current_query(&mut self) {
    let state = self.store.state();
    let Some(database_id) = state.selected_database else {
      return;
    };
    let Some(query) = state.query.clone().filter(|q| !q.value.trim().is_empty()) else {
      return;
    };

    let started = Instant::now();
    let result = self.driver.execute(ExecuteRequest { database_id, value: query.value.clone() }).await;
    let action = match result {
      Ok(response) => {
        let elapsed = started.elapsed();
        // Report at least 1ms for very fast round trips
        let millis = (elapsed.as_millis() as u64).max(1);
        Action::QuerySucceeded(query_result_from(response), millis)
      },
      Err(e) => Action::QueryFailed(e.to_string()),
    };
    if let Err(e) = self.tx.send(action) {
      tracing::error!("could not enqueue query result: {e}");
    }
  }

  /// Builds the primary-key-scoped UPDATE for the highlighted row, patches
  /// the local page optimistically, and fires the statement at the remote
  /// side. A later page refetch reconciles with the authoritative state.
  async fn apply_row_edit(&mut self, row_edit: &RowEdit) {
    let state = self.store.state();
    let (Some(page), Some(structure)) = (state.current_page.clone(), state.current_structure.clone()) else {
      tracing::debug!("row edit ignored: page or structure not loaded");
      return;
    };

    let Some(plan) = edit::build_update(&page, &structure, row_edit) else {
      return;
    };
    if let Err(e) = self.tx.send(Action::PagePatched { row: plan.row, cells: plan.cells.clone() }) {
      tracing::error!("could not enqueue page patch: {e}");
      return;
    }

    let request = ExecuteRequest { database_id: page.database_id, value: plan.statement.clone() };
    if let Err(e) = self.driver.execute(request).await {
      let _ = self.tx.send(Action::Error(e.to_string()));
    }
  }
}

fn query_result_from(response: ExecuteResponse) -> QueryResult {
  match response {
    ExecuteResponse::Select { columns, values } => {
      QueryResult::Table { columns, rows: values, highlighted_rows: vec![] }
    },
    ExecuteResponse::Insert { inserted_id } => QueryResult::Inserted { id: inserted_id },
    ExecuteResponse::UpdateDelete { affected_count } => QueryResult::Affected { count: affected_count },
  }
}
