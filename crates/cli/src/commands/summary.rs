use anyhow::{Context, Result};
use interop_runner_core::Ledger;
use std::path::Path;

use crate::display::print_ledger;

/// Report on a ledger without re-running anything.
pub fn summary_command(path: &Path) -> Result<i32> {
    let document = Ledger::load(path)
        .with_context(|| format!("Failed to read ledger {}", path.display()))?;
    print_ledger(&document);
    Ok(document.tally().exit_code())
}
