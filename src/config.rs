// Copyright 2023 Remi Bernotavicius

use crate::database::models::AuthorId;
use crate::Result;
use ::config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DATABASE_FILE_NAME: &str = "catalog.sqlite";
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Optional settings read from `config.toml` in the data directory and from `RECIPE_CATALOG_*`
/// environment variables. Command-line flags win over both.
#[derive(Debug, Default, Deserialize, Clone, PartialEq)]
pub struct Settings {
    /// Where the SQLite database lives. Defaults to `catalog.sqlite` in the data directory.
    pub database: Option<PathBuf>,
    /// Owner to create records for and to filter listings by.
    pub author: Option<i32>,
}

impl Settings {
    pub fn load(config_file: &Path) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::from(config_file).required(false))
            .add_source(Environment::with_prefix("RECIPE_CATALOG").try_parsing(true))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// The configured database, or `catalog.sqlite` in `data_path`. Only the latter creates
    /// `data_path`.
    pub fn database_path(&self, data_path: &Path) -> Result<PathBuf> {
        if let Some(database) = &self.database {
            return Ok(database.clone());
        }
        std::fs::create_dir_all(data_path)?;
        Ok(data_path.join(DATABASE_FILE_NAME))
    }

    pub fn author(&self) -> Option<AuthorId> {
        self.author.map(AuthorId::from)
    }
}

/// This is where the database and other user-data lives on-disk. On Linux it should be like:
/// `~/.local/share/recipe_catalog/`. The directory isn't created here.
pub fn data_path() -> Result<PathBuf> {
    let dirs = directories::BaseDirs::new().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "failed to get user home directory",
        )
    })?;
    Ok(dirs.data_dir().join("recipe_catalog"))
}

#[cfg(test)]
fn temp_data_path(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("recipe_catalog_{name}_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&path);
    path
}

#[test]
fn missing_file_gives_defaults() {
    let data_path = temp_data_path("defaults");
    let settings = Settings::load(&data_path.join(CONFIG_FILE_NAME)).unwrap();
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.author(), None);
    assert!(!data_path.exists());

    assert_eq!(
        settings.database_path(&data_path).unwrap(),
        data_path.join(DATABASE_FILE_NAME)
    );
    assert!(data_path.is_dir());
    std::fs::remove_dir_all(&data_path).unwrap();
}

#[test]
fn file_values_are_read() {
    let path = std::env::temp_dir().join(format!(
        "recipe_catalog_config_{}.toml",
        std::process::id()
    ));
    std::fs::write(&path, "database = \"/tmp/other.sqlite\"\nauthor = 3\n").unwrap();

    let settings = Settings::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(settings.author(), Some(AuthorId::from(3)));

    let data_path = temp_data_path("configured");
    assert_eq!(
        settings.database_path(&data_path).unwrap(),
        Path::new("/tmp/other.sqlite")
    );
    assert!(!data_path.exists());
}
