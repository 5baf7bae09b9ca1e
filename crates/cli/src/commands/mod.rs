pub mod list;
pub mod run;
pub mod summary;

pub use list::list_command;
pub use run::run_command;
pub use summary::summary_command;

use anyhow::{Context, Result};
use interop_runner_core::{Registry, Settings};
use std::env;
use tracing::debug;

use crate::cli::SelectionArgs;

/// Settings from the nearest `.interop-runner.json` plus the registry they
/// (or the `--registry` flag) point at.
pub(crate) fn load_context(selection: &SelectionArgs) -> Result<(Settings, Registry)> {
    let cwd = env::current_dir().context("Failed to get current directory")?;
    let settings = Settings::discover(&cwd)?;
    let registry_path = selection
        .registry
        .clone()
        .unwrap_or_else(|| settings.registry_path());
    debug!("Using registry {}", registry_path.display());

    let registry = Registry::load_from_file(&registry_path)
        .with_context(|| format!("Failed to load registry {}", registry_path.display()))?;
    Ok((settings, registry))
}
