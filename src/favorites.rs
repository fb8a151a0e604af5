use std::{fs, path::PathBuf};

use color_eyre::eyre::Result;

/// Persistent favorites: an ordered list of query strings, loaded once at
/// session start and rewritten on every toggle.
pub trait FavoritesStore: Send + Sync {
  fn load(&self) -> Result<Vec<String>>;
  fn save(&self, favorites: &[String]) -> Result<()>;
}

/// JSON file under the platform data directory.
pub struct JsonFavorites {
  path: PathBuf,
}

impl JsonFavorites {
  pub fn new(path: PathBuf) -> Self {
    Self { path }
  }

  pub fn at_default_location() -> Self {
    Self::new(crate::utils::get_data_dir().join("favorites.json"))
  }
}

impl FavoritesStore for JsonFavorites {
  fn load(&self) -> Result<Vec<String>> {
    if !self.path.exists() {
      return Ok(vec![]);
    }
    let contents = fs::read_to_string(&self.path)?;
    Ok(serde_json::from_str(&contents)?)
  }

  fn save(&self, favorites: &[String]) -> Result<()> {
    if let Some(parent) = self.path.parent() {
      fs::create_dir_all(parent)?;
    }
    fs::write(&self.path, serde_json::to_string_pretty(favorites)?)?;
    Ok(())
  }
}
