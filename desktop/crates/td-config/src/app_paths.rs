use crate::{ConfigError, ConfigErrorResult};

use std::path::{Path, PathBuf};

use serde::Serialize;

const DATA_DIR_ENV: &str = "TD_DATA_DIR";
const APP_DIR_NAME: &str = ".taskdeck";
const DATABASE_DIR: &str = "data";
const DATABASE_FILENAME: &str = "database.sqlite";
const LOGS_DIR: &str = "logs";

/// Locations the shell reports to the UI and hands to the backend.
///
/// Serialized as `{root, database, logs}` for the `get-app-paths` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppPaths {
    pub root: PathBuf,
    pub database: PathBuf,
    pub logs: PathBuf,
}

impl AppPaths {
    /// Resolve the application data root.
    ///
    /// Priority: explicit override > TD_DATA_DIR env var > `<home>/.taskdeck`
    pub fn resolve(override_root: Option<&Path>) -> ConfigErrorResult<Self> {
        if let Some(root) = override_root {
            return Ok(Self::from_root(root));
        }

        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            return Ok(Self::from_root(PathBuf::from(dir)));
        }

        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(Self::from_root(home.join(APP_DIR_NAME)))
    }

    pub fn from_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            database: root.join(DATABASE_DIR).join(DATABASE_FILENAME),
            logs: root.join(LOGS_DIR),
            root,
        }
    }

    /// Create the data root, log directory and database directory if missing.
    pub fn ensure(&self) -> ConfigErrorResult<()> {
        let database_dir = self.database.parent().unwrap_or(&self.root);

        for dir in [self.root.as_path(), self.logs.as_path(), database_dir] {
            std::fs::create_dir_all(dir).map_err(|e| ConfigError::io(dir, e))?;
        }

        Ok(())
    }
}
