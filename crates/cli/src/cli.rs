use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use interop_runner_core::{DraftVersion, RunConfig, SelectionPolicy, TargetFilter, Transport};
use std::path::PathBuf;

use crate::commands::{list_command, run_command, summary_command};

#[derive(Parser, Debug)]
#[command(name = "interop-runner")]
#[command(version, about, long_about = None)]
#[command(after_help = "ENVIRONMENT:\n    RUST_LOG=debug    Enable debug logging")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Flags that decide which pairs, versions and targets are considered.
#[derive(Args, Debug, Clone, Default)]
pub struct SelectionArgs {
    /// Implementation registry (defaults to implementations.json)
    #[arg(long)]
    pub registry: Option<PathBuf>,

    /// Only run relays as local containers
    #[arg(long)]
    pub docker_only: bool,

    /// Only run against remote relay endpoints
    #[arg(long)]
    pub remote_only: bool,

    /// Only use remote endpoints speaking this transport (quic, webtransport)
    #[arg(long)]
    pub transport: Option<String>,

    /// Draft version to aim for (e.g. draft-14); defaults to the registry's current_target
    #[arg(long)]
    pub target_version: Option<String>,

    /// Only test against this relay
    #[arg(long)]
    pub relay: Option<String>,

    /// Only test this client
    #[arg(long)]
    pub client: Option<String>,

    /// Test every shared draft version instead of picking one per pair
    #[arg(long)]
    pub sweep: bool,
}

impl SelectionArgs {
    pub fn to_run_config(&self) -> Result<RunConfig> {
        let target_version = self
            .target_version
            .as_deref()
            .map(str::parse::<DraftVersion>)
            .transpose()?;
        let transport = self
            .transport
            .as_deref()
            .map(|t| t.parse::<Transport>().unwrap_or_else(|never| match never {}));

        Ok(RunConfig {
            filter: TargetFilter {
                transport,
                docker_only: self.docker_only,
                remote_only: self.remote_only,
            },
            target_version,
            relay_filter: self.relay.clone(),
            client_filter: self.client.clone(),
            policy: if self.sweep {
                SelectionPolicy::Sweep
            } else {
                SelectionPolicy::Single
            },
        })
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the interop matrix and record results
    #[command(visible_alias = "r")]
    Run {
        #[command(flatten)]
        selection: SelectionArgs,

        /// Seconds to wait for a single run before killing it
        #[arg(long)]
        timeout: Option<u64>,

        /// Directory receiving one timestamped folder per invocation
        #[arg(long)]
        results_dir: Option<PathBuf>,

        /// Compose file used for docker-mode runs
        #[arg(long)]
        compose_file: Option<PathBuf>,

        /// Print the plan without executing anything
        #[arg(short, long)]
        list: bool,
    },
    /// List the pairs, versions and targets a run would use
    #[command(visible_alias = "l")]
    List {
        #[command(flatten)]
        selection: SelectionArgs,
    },
    /// Print the tally of a recorded ledger
    Summary {
        /// Path to a summary.json written by `run`
        ledger: PathBuf,
    },
}

impl Commands {
    /// Execute the command, returning the process exit status
    pub fn execute(self) -> Result<i32> {
        match self {
            Commands::Run {
                selection,
                timeout,
                results_dir,
                compose_file,
                list,
            } => {
                if list {
                    return list_command(&selection);
                }
                run_command(&selection, timeout, results_dir, compose_file)
            }
            Commands::List { selection } => list_command(&selection),
            Commands::Summary { ledger } => summary_command(&ledger),
        }
    }
}
