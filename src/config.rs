use std::path::PathBuf;

use color_eyre::eyre::Result;
use serde::Deserialize;

use crate::utils::get_config_dir;

/// Session configuration, layered from an optional `config.toml` in the
/// platform config dir and `DB_SCOUT_*` environment overrides.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub favorites_file: Option<PathBuf>,
}

impl Config {
  pub fn new() -> Result<Self> {
    let config_path = get_config_dir().join("config.toml");
    let builder = config::Config::builder()
      .add_source(config::File::from(config_path).required(false))
      .add_source(config::Environment::with_prefix("DB_SCOUT"));
    Ok(builder.build()?.try_deserialize()?)
  }
}
