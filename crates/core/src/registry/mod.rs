//! Typed, read-only view of the implementation registry.

mod types;

pub use types::{
    DockerTarget, EndpointStatus, Implementation, RemoteEndpoint, Role, RoleTargets, Roles,
    Transport,
};

use crate::{
    error::{Error, Result},
    version::DraftVersion,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// All known implementations, keyed by their unique id.
///
/// Keys iterate in sorted order, which keeps pair ordering stable across
/// invocations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Registry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_target: Option<DraftVersion>,
    #[serde(default)]
    pub implementations: BTreeMap<String, Implementation>,
}

impl Registry {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::RegistryError(format!("Failed to read {}: {e}", path.display()))
        })?;
        let registry = Self::from_json(&contents)?;
        debug!(
            "Loaded {} implementations from {}",
            registry.implementations.len(),
            path.display()
        );
        Ok(registry)
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        let registry: Registry = serde_json::from_str(contents)
            .map_err(|e| Error::RegistryError(format!("Failed to parse registry: {e}")))?;
        registry.validate()?;
        Ok(registry)
    }

    /// Reject entries the selection algorithm cannot reason about.
    pub fn validate(&self) -> Result<()> {
        for (key, implementation) in &self.implementations {
            if key.trim().is_empty() {
                return Err(Error::RegistryError("Implementation key must not be empty".into()));
            }
            // Keys name transcript files inside the invocation directory.
            if key == "."
                || key == ".."
                || key.contains(['/', '\\'])
                || key.contains(char::is_control)
            {
                return Err(Error::RegistryError(format!(
                    "Implementation key {key:?} cannot be used in a file name"
                )));
            }
            let has_any_role =
                implementation.has_role(Role::Client) || implementation.has_role(Role::Relay);
            if has_any_role && implementation.draft_versions.is_empty() {
                return Err(Error::RegistryError(format!(
                    "Implementation '{key}' declares a role but no draft_versions"
                )));
            }
            if let Some(relay) = implementation.roles.relay.as_ref() {
                if let Some(endpoint) = relay.remote.iter().find(|e| e.url.trim().is_empty()) {
                    return Err(Error::RegistryError(format!(
                        "Implementation '{key}' has a {} endpoint without a url",
                        endpoint.transport
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Implementation> {
        self.implementations.get(key)
    }

    /// Implementations declaring `role`, in key order.
    pub fn with_role(&self, role: Role) -> impl Iterator<Item = (&str, &Implementation)> {
        self.implementations
            .iter()
            .filter(move |(_, implementation)| implementation.has_role(role))
            .map(|(key, implementation)| (key.as_str(), implementation))
    }

    pub fn clients(&self) -> impl Iterator<Item = (&str, &Implementation)> {
        self.with_role(Role::Client)
    }

    pub fn relays(&self) -> impl Iterator<Item = (&str, &Implementation)> {
        self.with_role(Role::Relay)
    }
}
