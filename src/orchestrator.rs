use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::store::{
  models::{FetchKey, ViewMode, PAGE_SIZE},
  SessionState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum ResourceKind {
  Page,
  Structure,
  TableInfo,
  DatabaseList,
}

/// A remote fetch the current state is missing.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchTask {
  Page { key: FetchKey, start: u64, count: u64, order: Option<String>, reverse: bool },
  Structure { key: FetchKey },
  TableInfo { key: FetchKey },
  DatabaseList,
}

impl FetchTask {
  pub fn kind(&self) -> ResourceKind {
    match self {
      FetchTask::Page { .. } => ResourceKind::Page,
      FetchTask::Structure { .. } => ResourceKind::Structure,
      FetchTask::TableInfo { .. } => ResourceKind::TableInfo,
      FetchTask::DatabaseList => ResourceKind::DatabaseList,
    }
  }
}

/// Decides, on every state transition, which fetches are due. Guards are
/// level-triggered on the current state (the empty `current_page`,
/// `current_structure` fields), except the database list which is
/// edge-triggered on `outdated_database_list`. The pending map keeps one
/// in-flight request per resource kind: a repeat trigger for the same key is
/// suppressed, while a trigger for a new key supersedes the old entry and
/// the superseded response is later discarded by key mismatch.
#[derive(Default)]
pub struct Orchestrator {
  pending: HashMap<ResourceKind, Option<FetchKey>>,
}

impl Orchestrator {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn plan(&mut self, previous: &SessionState, current: &SessionState) -> Vec<FetchTask> {
    let mut tasks = vec![];

    if let (Some(database_id), Some(table)) = (current.selected_database, current.selected_table.as_ref()) {
      let key = FetchKey { database_id, table: table.clone() };

      if current.view_mode == ViewMode::Data
        && current.current_page.is_none()
        && self.admit(ResourceKind::Page, Some(key.clone()))
      {
        tasks.push(FetchTask::Page {
          key: key.clone(),
          start: current.page_row_number,
          count: PAGE_SIZE,
          order: current.current_sort.as_ref().map(|s| s.key.clone()),
          reverse: current.current_sort.as_ref().map(|s| s.reverse()).unwrap_or(false),
        });
      }

      // The update builder needs structure even outside the structure tab,
      // so this guard ignores the view mode.
      if current.current_structure.is_none() && self.admit(ResourceKind::Structure, Some(key.clone())) {
        tasks.push(FetchTask::Structure { key: key.clone() });
      }

      // Deliberately gated on the structure guard rather than a flag of its
      // own: the definition text only refetches alongside structure.
      if current.view_mode == ViewMode::TableInfo
        && current.current_structure.is_none()
        && self.admit(ResourceKind::TableInfo, Some(key.clone()))
      {
        tasks.push(FetchTask::TableInfo { key });
      }
    }

    if !previous.outdated_database_list
      && current.outdated_database_list
      && self.admit(ResourceKind::DatabaseList, None)
    {
      tasks.push(FetchTask::DatabaseList);
    }

    tasks
  }

  fn admit(&mut self, kind: ResourceKind, key: Option<FetchKey>) -> bool {
    if self.pending.get(&kind) == Some(&key) {
      return false;
    }
    self.pending.insert(kind, key);
    true
  }

  /// Clears the in-flight marker when the response it was waiting on
  /// arrives. A stale response (superseded key) leaves the marker for the
  /// newer request alone.
  pub fn settle(&mut self, kind: ResourceKind, key: Option<&FetchKey>) {
    if self.pending.get(&kind).map(|pending| pending.as_ref() == key).unwrap_or(false) {
      self.pending.remove(&kind);
    }
  }

  pub fn is_pending(&self, kind: ResourceKind) -> bool {
    self.pending.contains_key(&kind)
  }
}
