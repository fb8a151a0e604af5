use std::path::PathBuf;

use clap::Parser;

use crate::{
  store::models::{SortDirection, SortOrder},
  utils::version,
};

#[derive(Parser, Debug)]
#[command(author, version = version(), about)]
pub struct Cli {
  #[arg(value_name = "FILE", required = true, num_args = 1.., help = "SQLite database file(s) to inspect")]
  pub files: Vec<PathBuf>,

  #[arg(short('d'), long = "database", value_name = "NAME", help = "Database to select (defaults to the first)")]
  pub database: Option<String>,

  #[arg(short('t'), long = "table", value_name = "TABLE", help = "Table to select (defaults to the first)")]
  pub table: Option<String>,

  #[arg(long = "structure", help = "Show the table's column and index metadata instead of data")]
  pub structure: bool,

  #[arg(long = "info", help = "Show the table's CREATE statement instead of data")]
  pub info: bool,

  #[arg(short('q'), long = "query", value_name = "SQL", help = "Execute a query instead of browsing")]
  pub query: Option<String>,

  #[arg(long = "offset", value_name = "ROW", default_value_t = 0, help = "First row of the page to fetch")]
  pub offset: i64,

  #[arg(
    short('s'),
    long = "sort",
    value_name = "COLUMN[:desc]",
    help = "Sort the page by a column, descending with the :desc suffix"
  )]
  pub sort: Option<String>,

  #[arg(long = "favorites-file", value_name = "FILE", help = "Where to persist favorite queries")]
  pub favorites_file: Option<PathBuf>,
}

impl Cli {
  pub fn sort_order(&self) -> Option<SortOrder> {
    let sort = self.sort.as_deref()?;
    let (key, direction) = match sort.strip_suffix(":desc") {
      Some(key) => (key, SortDirection::Down),
      None => (sort.strip_suffix(":asc").unwrap_or(sort), SortDirection::Up),
    };
    Some(SortOrder { key: key.to_string(), direction })
  }
}
