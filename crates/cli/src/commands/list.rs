use anyhow::Result;
use interop_runner_core::Orchestrator;

use super::load_context;
use crate::cli::SelectionArgs;
use crate::display::print_plan;

pub fn list_command(selection: &SelectionArgs) -> Result<i32> {
    let (_settings, registry) = load_context(selection)?;
    let orchestrator = Orchestrator::new(&registry, selection.to_run_config()?)?;
    print_plan(&orchestrator.plan());
    Ok(0)
}
