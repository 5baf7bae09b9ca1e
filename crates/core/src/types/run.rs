use crate::{
    registry::Transport,
    targets::Mode,
    version::DraftVersion,
};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pass,
    Fail,
}

impl RunStatus {
    /// Exit code 0 passes; everything else, sentinels included, fails.
    pub fn from_exit_code(code: i32) -> Self {
        if code == 0 { RunStatus::Pass } else { RunStatus::Fail }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Pass => write!(f, "pass"),
            RunStatus::Fail => write!(f, "fail"),
        }
    }
}

/// One recorded execution of a pair against one relay target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    pub client: String,
    pub relay: String,
    pub version: DraftVersion,
    pub mode: Mode,
    pub target: String,
    #[serde(default)]
    pub tls_disable_verify: bool,
    pub status: RunStatus,
    pub exit_code: i32,
    /// Transcript file name, relative to the invocation directory.
    pub log_file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<Transport>,
    #[serde(default)]
    pub duration_ms: u64,
}

impl Run {
    pub fn passed(&self) -> bool {
        self.status == RunStatus::Pass
    }
}
