use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SETTINGS_FILE_NAME: &str = ".interop-runner.json";

const DEFAULT_REGISTRY: &str = "implementations.json";
const DEFAULT_RESULTS_DIR: &str = "results";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Project defaults read from `.interop-runner.json`.
///
/// Every field is optional; command-line flags win over the file and the
/// file wins over the built-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Settings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compose_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docker_program: Option<String>,
}

impl Settings {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut settings: Settings = serde_json::from_str(&contents)
            .map_err(|e| Error::config(format!("Failed to parse {}: {e}", path.display())))?;
        // Relative paths in the file are relative to the file, not the cwd.
        if let Some(base) = path.parent() {
            settings.rebase(base);
        }
        Ok(settings)
    }

    /// Walk up from `start_path` looking for a settings file.
    pub fn find_config_file(start_path: &Path) -> Option<PathBuf> {
        let mut current = start_path;

        loop {
            let config_path = current.join(SETTINGS_FILE_NAME);
            if config_path.exists() {
                return Some(config_path);
            }

            current = current.parent()?;
        }
    }

    /// Load the nearest settings file, or defaults when there is none.
    pub fn discover(start_path: &Path) -> Result<Self> {
        match Self::find_config_file(start_path) {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn registry_path(&self) -> PathBuf {
        self.registry
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_REGISTRY))
    }

    pub fn results_dir(&self) -> PathBuf {
        self.results_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_RESULTS_DIR))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    fn rebase(&mut self, base: &Path) {
        for path in [&mut self.registry, &mut self.results_dir, &mut self.compose_file]
            .into_iter()
            .flatten()
        {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}
