use crate::version::DraftVersion;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// The two roles an implementation can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Client,
    Relay,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Client => write!(f, "client"),
            Role::Relay => write!(f, "relay"),
        }
    }
}

/// Transport a remote endpoint speaks. Unknown names are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Transport {
    Quic,
    WebTransport,
    Other(String),
}

impl Transport {
    pub fn as_str(&self) -> &str {
        match self {
            Transport::Quic => "quic",
            Transport::WebTransport => "webtransport",
            Transport::Other(name) => name,
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Transport {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Ok(match name.to_ascii_lowercase().as_str() {
            "quic" | "raw-quic" => Transport::Quic,
            "webtransport" | "wt" => Transport::WebTransport,
            _ => Transport::Other(name.to_string()),
        })
    }
}

impl Serialize for Transport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Transport {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let Ok(transport) = raw.parse::<Transport>();
        Ok(transport)
    }
}

/// Whether a remote endpoint should be scheduled at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointStatus {
    #[default]
    Active,
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DockerTarget {
    pub image: String,
}

/// A publicly reachable deployment of a relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEndpoint {
    pub url: String,
    pub transport: Transport,
    #[serde(default)]
    pub status: EndpointStatus,
    #[serde(default)]
    pub tls_disable_verify: bool,
}

impl RemoteEndpoint {
    pub fn is_active(&self) -> bool {
        self.status == EndpointStatus::Active
    }
}

/// Where a role can be run: a container image and/or remote endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleTargets {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker: Option<DockerTarget>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remote: Vec<RemoteEndpoint>,
}

impl RoleTargets {
    pub fn image(&self) -> Option<&str> {
        self.docker.as_ref().map(|d| d.image.as_str())
    }

    /// A role with neither an image nor endpoints is the same as no role.
    pub fn is_empty(&self) -> bool {
        self.docker.is_none() && self.remote.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roles {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<RoleTargets>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relay: Option<RoleTargets>,
}

/// One entry of the implementation registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Implementation {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    /// Accepts `draft-7`, `draft-07` or `7`; always written back, and passed
    /// to clients, in the two-digit IETF form `draft-07`.
    #[serde(default)]
    pub draft_versions: BTreeSet<DraftVersion>,
    #[serde(default)]
    pub roles: Roles,
}

impl Implementation {
    /// Targets for `role`, or `None` when the role is absent or empty.
    pub fn role(&self, role: Role) -> Option<&RoleTargets> {
        let targets = match role {
            Role::Client => self.roles.client.as_ref(),
            Role::Relay => self.roles.relay.as_ref(),
        };
        targets.filter(|t| !t.is_empty())
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.role(role).is_some()
    }
}
