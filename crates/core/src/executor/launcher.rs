//! Construction of the external process behind a single run.

use crate::{
    error::{Error, Result},
    targets::Mode,
};
use std::path::PathBuf;
use std::process::Command;

use super::RunRequest;

/// Builds the process that exercises one client against one relay target.
///
/// The executor owns spawning, output capture and timeouts; a launcher only
/// decides what to run.
pub trait Launcher: Send + Sync {
    fn command(&self, request: &RunRequest<'_>) -> Result<Command>;

    /// Command releasing what `command` started, run after the executor had
    /// to kill it on timeout or interrupt.
    fn cleanup(&self, _request: &RunRequest<'_>) -> Result<Option<Command>> {
        Ok(None)
    }

    /// Get the name of this launcher
    fn name(&self) -> &'static str;
}

/// Runs clients and relays as containers through the docker CLI.
#[derive(Debug, Clone)]
pub struct DockerLauncher {
    pub program: String,
    pub compose_file: PathBuf,
    pub network: String,
}

impl Default for DockerLauncher {
    fn default() -> Self {
        Self {
            program: "docker".to_string(),
            compose_file: PathBuf::from("docker-compose.test.yml"),
            network: "host".to_string(),
        }
    }
}

impl DockerLauncher {
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_compose_file(mut self, compose_file: impl Into<PathBuf>) -> Self {
        self.compose_file = compose_file.into();
        self
    }

    fn compose(&self, request: &RunRequest<'_>) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg("compose")
            .arg("-f")
            .arg(&self.compose_file)
            .args(["-p", &compose_project(request)])
            .env("RELAY_IMAGE", &request.target.reference)
            .env("DRAFT_VERSION", request.version.to_string());
        if let Some(client_image) = request.client_image {
            command.env("CLIENT_IMAGE", client_image);
        }
        command
    }
}

impl Launcher for DockerLauncher {
    fn command(&self, request: &RunRequest<'_>) -> Result<Command> {
        let client_image = request.client_image.ok_or_else(|| {
            Error::config(format!(
                "client '{}' has no docker image to run",
                request.pair.client
            ))
        })?;
        let draft = request.version.to_string();

        let command = match request.target.mode {
            Mode::Docker => {
                let mut command = self.compose(request);
                command.args(["up", "--abort-on-container-exit", "--exit-code-from", "client"]);
                command
            }
            Mode::Remote => {
                let mut command = Command::new(&self.program);
                command
                    .args(["run", "--rm", "--name", &container_name(request)])
                    .args(["--network", &self.network])
                    .args(["-e", &format!("RELAY_URL={}", request.target.reference)]);
                if let Some(transport) = &request.target.transport {
                    command.args(["-e", &format!("TRANSPORT={transport}")]);
                }
                command.args(["-e", &format!("DRAFT_VERSION={draft}")]);
                if request.target.tls_disable_verify {
                    command.args(["-e", "TLS_DISABLE_VERIFY=1"]);
                }
                command.arg(client_image);
                command
            }
        };
        Ok(command)
    }

    fn cleanup(&self, request: &RunRequest<'_>) -> Result<Option<Command>> {
        let command = match request.target.mode {
            Mode::Docker => {
                let mut command = self.compose(request);
                command.args(["down", "--remove-orphans"]);
                command
            }
            Mode::Remote => {
                let mut command = Command::new(&self.program);
                command.args(["rm", "-f", &container_name(request)]);
                command
            }
        };
        Ok(Some(command))
    }

    fn name(&self) -> &'static str {
        "docker"
    }
}

fn compose_project(request: &RunRequest<'_>) -> String {
    docker_name(&format!(
        "interop-{}-{}",
        request.pair.client, request.pair.relay
    ))
}

fn container_name(request: &RunRequest<'_>) -> String {
    docker_name(&format!(
        "interop-{}-{}-remote-{}",
        request.pair.client, request.pair.relay, request.ordinal
    ))
}

/// Compose project names only allow lowercase alphanumerics, `-` and `_`;
/// container names accept a superset.
fn docker_name(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' }
        })
        .collect()
}

/// Render a command the way a user would type it.
pub fn to_shell_command(command: &Command) -> String {
    let mut cmd = command.get_program().to_string_lossy().into_owned();
    for arg in command.get_args() {
        let arg = arg.to_string_lossy();
        cmd.push(' ');
        if arg.contains(' ') {
            cmd.push_str(&format!("'{arg}'"));
        } else {
            cmd.push_str(&arg);
        }
    }
    cmd
}
