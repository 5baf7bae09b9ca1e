use interop_runner_core::{LedgerDocument, Plan, Run, Summary, Tally};

/// One line per run, e.g. `✅ moq-rs -> quicr [draft-14] docker quicr-relay`.
pub fn format_run(run: &Run) -> String {
    let icon = if run.passed() { "✅" } else { "❌" };
    let mut line = format!(
        "{icon} {} -> {} [{}] {} {}",
        run.client, run.relay, run.version, run.mode, run.target
    );
    if let Some(transport) = &run.transport {
        line.push_str(&format!(" ({transport})"));
    }
    if !run.passed() {
        line.push_str(&format!(" exit={} log={}", run.exit_code, run.log_file));
    }
    line
}

pub fn format_tally(tally: &Tally) -> String {
    format!(
        "Total: {}  Passed: {}  Failed: {}",
        tally.total, tally.passed, tally.failed
    )
}

pub fn print_plan(plan: &Plan) {
    println!("📋 Interop plan");
    println!("{}", "=".repeat(60));
    print!("{plan}");
    println!("{}", "=".repeat(60));
    println!(
        "   • {} runs planned, {} pairs skipped",
        plan.run_count(),
        plan.skipped().count()
    );
}

pub fn print_summary(summary: &Summary, runs: &[Run]) {
    println!("{}", "=".repeat(60));
    for run in runs {
        println!("{}", format_run(run));
    }
    if !summary.skipped.is_empty() {
        println!("⏭️  Skipped (no shared draft version):");
        for pair in &summary.skipped {
            println!("   • {pair}");
        }
    }
    if summary.cancelled {
        println!("⚠️  Interrupted before all pairs were tested");
    }
    println!("📊 {}", format_tally(&summary.tally));
    println!("📄 Ledger: {}", summary.ledger_path.display());
}

pub fn print_ledger(document: &LedgerDocument) {
    println!(
        "🧪 Target version: {} (started {})",
        document.target_version,
        document.started_at.to_rfc3339()
    );
    for run in &document.runs {
        println!("{}", format_run(run));
    }
    println!("📊 {}", format_tally(&document.tally()));
}
