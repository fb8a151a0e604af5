pub mod models;
pub mod state;

// Re-export commonly used types
pub use models::{
    FetchKey, Page, Query, QueryResult, SortDirection, SortOrder, Structure, TableInfo, ViewMode, PAGE_SIZE,
};
pub use state::SessionState;

use crate::action::Action;

type Subscriber = Box<dyn Fn(&SessionState, &SessionState) + Send>;

/// Owns the session state. All mutation goes through `dispatch`, which
/// applies the pure reducer and then synchronously notifies subscribers with
/// `(new, previous)` in registration order.
pub struct Store {
    state: SessionState,
    subscribers: Vec<Subscriber>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new(SessionState::default())
    }
}

impl Store {
    pub fn new(initial: SessionState) -> Self {
        Self { state: initial, subscribers: vec![] }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn subscribe(&mut self, subscriber: impl Fn(&SessionState, &SessionState) + Send + 'static) {
        self.subscribers.push(Box::new(subscriber));
    }

    /// Applies the reducer and returns the previous snapshot so callers can
    /// compare the transition.
    pub fn dispatch(&mut self, action: &Action) -> SessionState {
        let next = self.state.reduce(action);
        let previous = std::mem::replace(&mut self.state, next);
        for subscriber in &self.subscribers {
            subscriber(&self.state, &previous);
        }
        previous
    }
}
