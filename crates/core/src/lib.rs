//! interop-runner-core - pairwise interop testing of protocol implementations
//!
//! This crate provides functionality to:
//! - Load a typed registry of client and relay implementations
//! - Pick one mutually supported draft version per (client, relay) pair
//! - Expand relays into docker and remote targets, honouring filters
//! - Run each target as an external process and record the outcome in a
//!   crash-safe ledger
pub mod config;
pub mod error;
pub mod executor;
pub mod ledger;
pub mod orchestrator;
pub mod registry;
pub mod targets;
pub mod types;
pub mod version;

// Re-export commonly used types and traits
pub use error::{Error, Result};
pub use types::*;

// Re-export main API components
pub use config::{RunConfig, Settings};
pub use executor::{CancelFlag, DockerLauncher, ExecutorOptions, Launcher, RunExecutor, RunRequest};
pub use ledger::{Ledger, LedgerDocument, Tally, atomic_write};
pub use orchestrator::{Orchestrator, Plan, Summary};
pub use registry::{Registry, Role, Transport};
pub use targets::{Mode, RunTarget, TargetFilter, enumerate_targets};
pub use version::{DraftVersion, SelectionPolicy, select_version, sweep_versions};
