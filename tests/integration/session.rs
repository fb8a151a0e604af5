use std::sync::Arc;

use db_scout::{
    action::Action,
    app::Session,
    edit::RowEdit,
    protocol::ExecuteResponse,
    store::{QueryResult, SortDirection, SortOrder, ViewMode},
    value::Value,
};
use pretty_assertions::assert_eq;

use crate::test_utils::{users_structure, FakeDriver, MemoryFavorites, SharedFavorites};

fn users_rows() -> Vec<Vec<Value>> {
    vec![
        vec![Value::Bigint(7), Value::String("Alice".to_string()), Value::Bigint(34)],
        vec![Value::Bigint(8), Value::String("Bob".to_string()), Value::Null],
    ]
}

fn users_driver() -> Arc<FakeDriver> {
    Arc::new(
        FakeDriver::new()
            .with_database(1, "main")
            .with_table(1, "users", &["id", "name", "age"], users_rows())
            .with_structure(1, "users", &users_structure(1)),
    )
}

fn session_with(driver: Arc<FakeDriver>) -> (Session, Arc<MemoryFavorites>) {
    let favorites = Arc::new(MemoryFavorites::default());
    (Session::new(driver, Box::new(SharedFavorites(favorites.clone()))), favorites)
}

#[tokio::test]
async fn startup_loads_the_list_and_defaults_the_selection() {
    let driver = users_driver();
    let (mut session, _) = session_with(driver.clone());
    session.start().await.unwrap();

    let state = session.state();
    assert_eq!(state.selected_database, Some(1));
    assert_eq!(state.selected_table.as_deref(), Some("users"));
    assert_eq!(state.current_page.as_ref().unwrap().total, 2);
    assert!(state.current_structure.is_some());
    assert_eq!(state.error, None);

    let calls = driver.calls();
    assert_eq!(calls[0], "databaseList");
    assert!(calls.iter().any(|c| c.starts_with("getTableData users")));
    assert!(calls.iter().any(|c| c.starts_with("getTableStructure users")));
}

#[tokio::test]
async fn a_late_response_for_a_previous_table_is_discarded() {
    let driver = Arc::new(
        FakeDriver::new()
            .with_database(1, "main")
            .with_table(1, "alpha", &["a"], vec![vec![Value::Bigint(1)]])
            .with_table(1, "beta", &["b"], vec![vec![Value::Bigint(2)]])
            .with_table(1, "gamma", &["c"], vec![vec![Value::Bigint(3)]]),
    );
    let (mut session, _) = session_with(driver.clone());
    session.start().await.unwrap();

    // Both selections are queued before any response merges, so the beta
    // page resolves while gamma is already the live selection.
    session.dispatch(Action::SelectTable("beta".to_string())).unwrap();
    session.dispatch(Action::SelectTable("gamma".to_string())).unwrap();
    session.run_until_idle().await.unwrap();

    let page = session.state().current_page.as_ref().unwrap();
    assert_eq!(page.table, "gamma");
    assert_eq!(page.rows, vec![vec![Value::Bigint(3)]]);
    assert_eq!(session.state().current_structure.as_ref().unwrap().table, "gamma");
}

#[tokio::test]
async fn a_failed_fetch_surfaces_the_error_and_retries_on_the_next_transition() {
    let driver = users_driver();
    driver.fail("getTableData");
    driver.fail("getTableStructure");

    let (mut session, _) = session_with(driver.clone());
    session.start().await.unwrap();

    let state = session.state();
    assert!(state.error.is_some());
    assert_eq!(state.current_page, None);
    assert_eq!(state.current_structure, None);

    driver.pass("getTableData");
    driver.pass("getTableStructure");
    session.dispatch(Action::Refresh).unwrap();
    session.run_until_idle().await.unwrap();

    let state = session.state();
    assert_eq!(state.error, None);
    assert!(state.current_page.is_some());
    assert!(state.current_structure.is_some());
}

#[tokio::test]
async fn history_keeps_every_submission_even_failed_ones() {
    let driver = users_driver();
    let (mut session, _) = session_with(driver.clone());
    session.start().await.unwrap();

    driver.fail("execute");
    session.dispatch(Action::UpdateQuery("A".to_string())).unwrap();
    session.dispatch(Action::ExecuteQuery).unwrap();
    session.run_until_idle().await.unwrap();

    assert!(session.state().error.is_some());
    assert_eq!(session.state().query_result, None);

    driver.pass("execute");
    driver.push_execute_result(ExecuteResponse::Select {
        columns: vec!["n".to_string()],
        values: vec![vec![Value::Bigint(1)]],
    });
    session.dispatch(Action::UpdateQuery("B".to_string())).unwrap();
    session.dispatch(Action::ExecuteQuery).unwrap();
    session.run_until_idle().await.unwrap();

    let state = session.state();
    let history: Vec<&str> = state.query_history.iter().map(|q| q.value.as_str()).collect();
    assert_eq!(history, vec!["A", "B"]);
    assert_eq!(state.error, None);
    assert!(matches!(state.query_result, Some(QueryResult::Table { .. })));
    assert!(state.execution_time_ms.unwrap() >= 1);
}

#[tokio::test]
async fn toggling_a_favorite_persists_each_rewrite() {
    let (mut session, favorites) = session_with(users_driver());
    session.start().await.unwrap();

    session.dispatch(Action::UpdateQuery("SELECT 1".to_string())).unwrap();
    session.dispatch(Action::ToggleFavorite).unwrap();
    session.run_until_idle().await.unwrap();
    assert_eq!(session.state().favorites, vec!["SELECT 1".to_string()]);

    session.dispatch(Action::ToggleFavorite).unwrap();
    session.run_until_idle().await.unwrap();
    assert_eq!(session.state().favorites, Vec::<String>::new());

    let saved = favorites.saved.lock().unwrap();
    assert_eq!(*saved, vec![vec!["SELECT 1".to_string()], vec![]]);
}

#[tokio::test]
async fn editing_a_cell_patches_the_page_and_sends_the_update() {
    let driver = users_driver();
    let (mut session, _) = session_with(driver.clone());
    session.start().await.unwrap();

    session.dispatch(Action::HighlightRow(0)).unwrap();
    session.dispatch(Action::ApplyRowEdit(RowEdit::default().set("name", "Bob"))).unwrap();
    session.run_until_idle().await.unwrap();

    let page = session.state().current_page.as_ref().unwrap();
    assert_eq!(page.rows[0][1], Value::String("Bob".to_string()));
    assert_eq!(page.rows[0][0], Value::Bigint(7));

    let expected = r#"execute UPDATE "users" SET "name" = 'Bob' WHERE "id" = 7"#;
    assert!(driver.calls().iter().any(|c| c == expected), "missing {expected} in {:?}", driver.calls());
}

#[tokio::test]
async fn the_definition_text_rides_along_with_structure_refetches() {
    let driver = Arc::new(
        FakeDriver::new()
            .with_database(1, "main")
            .with_table(1, "alpha", &["a"], vec![])
            .with_table(1, "beta", &["b"], vec![]),
    );
    let (mut session, _) = session_with(driver.clone());
    session.start().await.unwrap();

    // Structure is already loaded, so entering the definition tab fetches
    // nothing: the text shares the structure guard.
    session.dispatch(Action::SetViewMode(ViewMode::TableInfo)).unwrap();
    session.run_until_idle().await.unwrap();
    assert!(!driver.calls().iter().any(|c| c.starts_with("getTableInfo")));
    assert_eq!(session.state().table_info, None);

    // A selection change clears structure, and the definition fetch rides
    // the same transition.
    session.dispatch(Action::SelectTable("beta".to_string())).unwrap();
    session.run_until_idle().await.unwrap();
    assert!(driver.calls().iter().any(|c| c == "getTableInfo beta"));
    assert_eq!(session.state().table_info.as_ref().unwrap().table, "beta");
}

#[tokio::test]
async fn paging_and_sorting_drive_fresh_keyed_fetches() {
    let rows: Vec<Vec<Value>> =
        (0..120).map(|i| vec![Value::Bigint(i), Value::String(format!("row{i:03}"))]).collect();
    let driver = Arc::new(
        FakeDriver::new().with_database(1, "main").with_table(1, "big", &["id", "label"], rows),
    );
    let (mut session, _) = session_with(driver.clone());
    session.start().await.unwrap();

    let page = session.state().current_page.as_ref().unwrap();
    assert_eq!((page.start, page.count, page.total), (0, 50, 120));

    session.dispatch(Action::NextPage).unwrap();
    session.run_until_idle().await.unwrap();
    assert_eq!(session.state().current_page.as_ref().unwrap().start, 50);

    session.dispatch(Action::GoToRow(1000)).unwrap();
    session.run_until_idle().await.unwrap();
    let page = session.state().current_page.as_ref().unwrap();
    assert_eq!(page.start, 70);
    assert_eq!(page.count, 50);

    session
        .dispatch(Action::SortBy(Some(SortOrder { key: "id".to_string(), direction: SortDirection::Down })))
        .unwrap();
    session.run_until_idle().await.unwrap();
    let page = session.state().current_page.as_ref().unwrap();
    assert_eq!(page.start, 0);
    assert_eq!(page.rows[0][0], Value::Bigint(119));
}
