//! Shared fixtures for the workspace integration tests.

use interop_runner_core::{
    DraftVersion, ExecutorOptions, Launcher, Ledger, LedgerDocument, Orchestrator, Registry,
    Result, RunConfig, RunExecutor, RunRequest, Summary, Transport,
    registry::{DockerTarget, EndpointStatus, Implementation, RemoteEndpoint, RoleTargets, Roles},
};
use std::collections::HashMap;
use std::process::Command;
use tempfile::TempDir;

/// Exits with the code registered for the relay, 0 otherwise.
#[derive(Debug, Default, Clone)]
pub struct ExitCodeLauncher {
    codes: HashMap<String, i32>,
}

impl ExitCodeLauncher {
    pub fn failing(mut self, relay: &str, code: i32) -> Self {
        self.codes.insert(relay.to_string(), code);
        self
    }
}

impl Launcher for ExitCodeLauncher {
    fn command(&self, request: &RunRequest<'_>) -> Result<Command> {
        let code = self.codes.get(&request.pair.relay).copied().unwrap_or(0);
        let mut command = Command::new("sh");
        command
            .arg("-c")
            .arg(format!("echo {}; exit {code}", request.target.reference));
        Ok(command)
    }

    fn name(&self) -> &'static str {
        "exit-code"
    }
}

/// Builder for registry entries used by the tests.
#[derive(Debug, Clone)]
pub struct ImplementationBuilder {
    implementation: Implementation,
}

impl ImplementationBuilder {
    pub fn new(name: &str, versions: &[u32]) -> Self {
        Self {
            implementation: Implementation {
                name: name.to_string(),
                organization: None,
                repository: None,
                draft_versions: versions.iter().copied().map(DraftVersion::new).collect(),
                roles: Roles::default(),
            },
        }
    }

    pub fn client(mut self, image: &str) -> Self {
        self.implementation.roles.client = Some(RoleTargets {
            docker: Some(DockerTarget {
                image: image.to_string(),
            }),
            remote: Vec::new(),
        });
        self
    }

    pub fn relay_image(mut self, image: &str) -> Self {
        self.relay_mut().docker = Some(DockerTarget {
            image: image.to_string(),
        });
        self
    }

    pub fn relay_endpoint(mut self, url: &str, transport: &str, active: bool) -> Self {
        let Ok(transport) = transport.parse::<Transport>();
        self.relay_mut().remote.push(RemoteEndpoint {
            url: url.to_string(),
            transport,
            status: if active {
                EndpointStatus::Active
            } else {
                EndpointStatus::Inactive
            },
            tls_disable_verify: false,
        });
        self
    }

    pub fn build(self) -> Implementation {
        self.implementation
    }

    fn relay_mut(&mut self) -> &mut RoleTargets {
        self.implementation
            .roles
            .relay
            .get_or_insert_with(RoleTargets::default)
    }
}

pub fn registry(target: u32, entries: Vec<(&str, ImplementationBuilder)>) -> Registry {
    let registry = Registry {
        current_target: Some(DraftVersion::new(target)),
        implementations: entries
            .into_iter()
            .map(|(key, builder)| (key.to_string(), builder.build()))
            .collect(),
    };
    registry.validate().expect("fixture registry is valid");
    registry
}

/// Run one full invocation into a fresh results directory.
pub fn run_invocation(
    registry: &Registry,
    config: RunConfig,
    launcher: ExitCodeLauncher,
) -> Result<(Summary, LedgerDocument, TempDir)> {
    let results = TempDir::new()?;
    let orchestrator = Orchestrator::new(registry, config)?;
    let mut ledger = Ledger::create_in(results.path(), orchestrator.target_version())?;
    let executor = RunExecutor::new(Box::new(launcher), ExecutorOptions::new(ledger.dir()));
    let summary = orchestrator.run(&executor, &mut ledger)?;
    let document = Ledger::load(&summary.ledger_path)?;
    Ok((summary, document, results))
}
