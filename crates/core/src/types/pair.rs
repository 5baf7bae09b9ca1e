use serde::{Deserialize, Serialize};
use std::fmt;

/// A (client, relay) combination considered once per invocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pair {
    pub client: String,
    pub relay: String,
}

impl Pair {
    pub fn new(client: impl Into<String>, relay: impl Into<String>) -> Self {
        Self {
            client: client.into(),
            relay: relay.into(),
        }
    }

    /// Compact `client:relay` label for listings.
    pub fn key(&self) -> String {
        format!("{}:{}", self.client, self.relay)
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.client, self.relay)
    }
}
