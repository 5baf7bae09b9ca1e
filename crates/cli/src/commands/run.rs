use anyhow::{Context, Result};
use interop_runner_core::{
    CancelFlag, DockerLauncher, ExecutorOptions, Ledger, Orchestrator, RunExecutor,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use super::load_context;
use crate::cli::SelectionArgs;
use crate::display::print_summary;

pub fn run_command(
    selection: &SelectionArgs,
    timeout: Option<u64>,
    results_dir: Option<PathBuf>,
    compose_file: Option<PathBuf>,
) -> Result<i32> {
    let (settings, registry) = load_context(selection)?;
    let orchestrator = Orchestrator::new(&registry, selection.to_run_config()?)?;

    let results_dir = results_dir.unwrap_or_else(|| settings.results_dir());
    let mut ledger = Ledger::create_in(&results_dir, orchestrator.target_version())
        .with_context(|| format!("Failed to create ledger under {}", results_dir.display()))?;
    println!("🧪 Target version: {}", orchestrator.target_version());
    println!("📁 Results: {}", ledger.dir().display());

    let mut launcher = DockerLauncher::default();
    if let Some(program) = settings.docker_program.clone() {
        launcher = launcher.with_program(program);
    }
    if let Some(compose_file) = compose_file.or_else(|| settings.compose_file.clone()) {
        launcher = launcher.with_compose_file(compose_file);
    }
    let timeout = timeout.map_or_else(|| settings.timeout(), Duration::from_secs);
    info!("Per-run timeout: {timeout:?}");

    let cancel = CancelFlag::new();
    let handler_flag = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_flag.cancel()) {
        warn!("Could not install interrupt handler: {e}");
    }

    let executor = RunExecutor::new(
        Box::new(launcher),
        ExecutorOptions::new(ledger.dir()).with_timeout(timeout),
    )
    .with_cancel_flag(cancel);

    let summary = orchestrator.run(&executor, &mut ledger)?;
    print_summary(&summary, ledger.runs());
    Ok(summary.exit_code())
}
