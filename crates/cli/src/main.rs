use clap::Parser;
use interop_runner::Cli;

/// Exit status for invocations aborted by configuration or ledger errors.
const EXIT_ABORTED: i32 = 2;

fn main() {
    // Initialize tracing based on RUST_LOG env var
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let code = match cli.command.execute() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("❌ Error: {e:#}");
            EXIT_ABORTED
        }
    };
    std::process::exit(code);
}
