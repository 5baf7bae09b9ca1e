//! Expansion of a relay's role targets into concrete runnable targets.

use crate::{
    error::{Error, Result},
    registry::{RoleTargets, Transport},
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a run reaches the relay under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Docker,
    Remote,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Docker => write!(f, "docker"),
            Mode::Remote => write!(f, "remote"),
        }
    }
}

/// One deployment of a relay a client can be pointed at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTarget {
    pub mode: Mode,
    /// Image name for docker targets, URL for remote ones.
    pub reference: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<Transport>,
    #[serde(default)]
    pub tls_disable_verify: bool,
}

impl fmt::Display for RunTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.transport {
            Some(transport) => write!(f, "{} {} ({transport})", self.mode, self.reference),
            None => write!(f, "{} {}", self.mode, self.reference),
        }
    }
}

/// Deployment filters selected on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetFilter {
    pub transport: Option<Transport>,
    pub docker_only: bool,
    pub remote_only: bool,
}

impl TargetFilter {
    pub fn validate(&self) -> Result<()> {
        if self.docker_only && self.remote_only {
            return Err(Error::config(
                "--docker-only and --remote-only are mutually exclusive",
            ));
        }
        Ok(())
    }

    fn allows_docker(&self) -> bool {
        !self.remote_only
    }

    fn allows_remote(&self) -> bool {
        !self.docker_only
    }

    fn matches_transport(&self, transport: &Transport) -> bool {
        self.transport.as_ref().is_none_or(|wanted| wanted == transport)
    }
}

/// Concrete targets for a relay, in registry declaration order.
///
/// The docker target (if any) comes first, followed by every active remote
/// endpoint that passes the transport filter. Inactive endpoints never
/// appear, whatever the filter says.
pub fn enumerate_targets(relay: &RoleTargets, filter: &TargetFilter) -> Vec<RunTarget> {
    let mut targets = Vec::new();

    if filter.allows_docker() {
        if let Some(image) = relay.image() {
            targets.push(RunTarget {
                mode: Mode::Docker,
                reference: image.to_string(),
                transport: None,
                tls_disable_verify: false,
            });
        }
    }

    if filter.allows_remote() {
        targets.extend(
            relay
                .remote
                .iter()
                .filter(|endpoint| endpoint.is_active())
                .filter(|endpoint| filter.matches_transport(&endpoint.transport))
                .map(|endpoint| RunTarget {
                    mode: Mode::Remote,
                    reference: endpoint.url.clone(),
                    transport: Some(endpoint.transport.clone()),
                    tls_disable_verify: endpoint.tls_disable_verify,
                }),
        );
    }

    targets
}
