use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{eyre, Result};
use db_scout::{
  action::Action,
  app::Session,
  cli::Cli,
  config::Config,
  favorites::JsonFavorites,
  presenter::{self, TableView},
  sql::SqliteDriver,
  store::ViewMode,
  utils::{initialize_logging, initialize_panic_handler},
};

async fn tokio_main() -> Result<()> {
  initialize_logging()?;

  initialize_panic_handler()?;

  let args = Cli::parse();
  let config = Config::new()?;

  let favorites = args
    .favorites_file
    .clone()
    .or(config.favorites_file.clone())
    .map(JsonFavorites::new)
    .unwrap_or_else(JsonFavorites::at_default_location);

  let driver = Arc::new(SqliteDriver::open(&args.files).await?);
  let mut session = Session::new(driver, Box::new(favorites));
  session.start().await?;

  if let Some(name) = &args.database {
    let id = session
      .state()
      .databases
      .iter()
      .find(|d| &d.name == name)
      .map(|d| d.id)
      .ok_or_else(|| eyre!("no database named {name}"))?;
    session.dispatch(Action::SelectDatabase(id))?;
  }
  if let Some(table) = &args.table {
    session.dispatch(Action::SelectTable(table.clone()))?;
  }
  if let Some(order) = args.sort_order() {
    session.dispatch(Action::SortBy(Some(order)))?;
  }
  session.run_until_idle().await?;

  if args.offset > 0 {
    session.dispatch(Action::GoToRow(args.offset))?;
    session.run_until_idle().await?;
  }

  if let Some(query) = &args.query {
    session.dispatch(Action::SetViewMode(ViewMode::Sql))?;
    session.dispatch(Action::UpdateQuery(query.clone()))?;
    session.dispatch(Action::ExecuteQuery)?;
  } else if args.structure {
    session.dispatch(Action::SetViewMode(ViewMode::Structure))?;
  } else if args.info {
    session.dispatch(Action::SetViewMode(ViewMode::TableInfo))?;
  }
  session.run_until_idle().await?;

  let state = session.state();
  if let Some(error) = &state.error {
    eprintln!("{} error: {error}", env!("CARGO_PKG_NAME"));
  }

  print_view(&presenter::render(state));
  if args.structure {
    if let Some(indexes) = presenter::render_indexes(state) {
      println!();
      print_view(&indexes);
    }
  }

  Ok(())
}

fn print_view(view: &TableView) {
  println!("{}", view.title);
  if view.columns.is_empty() {
    return;
  }

  let mut widths: Vec<usize> = view.columns.iter().map(|c| c.len()).collect();
  for row in &view.rows {
    for (i, cell) in row.iter().enumerate() {
      if let Some(width) = widths.get_mut(i) {
        *width = (*width).max(cell.len()).min(60);
      }
    }
  }

  let line = |cells: &[String]| {
    cells
      .iter()
      .enumerate()
      .map(|(i, cell)| {
        let width = widths.get(i).copied().unwrap_or(0);
        format!("{:<width$}", truncate(cell, 60))
      })
      .collect::<Vec<_>>()
      .join("  ")
  };

  println!("{}", line(&view.columns));
  println!("{}", "-".repeat(widths.iter().sum::<usize>() + widths.len().saturating_sub(1) * 2));
  for row in &view.rows {
    println!("{}", line(row));
  }
}

fn truncate(cell: &str, max: usize) -> String {
  if cell.chars().count() <= max {
    cell.to_string()
  } else {
    let kept: String = cell.chars().take(max.saturating_sub(1)).collect();
    format!("{kept}…")
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  if let Err(e) = tokio_main().await {
    eprintln!("{} error: Something went wrong", env!("CARGO_PKG_NAME"));
    Err(e)
  } else {
    Ok(())
  }
}
