//! Append-only record of the runs of one invocation.
//!
//! The ledger is rewritten in full after every append through
//! [`atomic_write`], so an interrupted invocation always leaves a file that
//! parses and tallies to the runs recorded before the interruption.

mod atomic;

pub use atomic::atomic_write;

use crate::{
    error::{Error, Result},
    types::{Run, RunStatus},
    version::DraftVersion,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name of the persisted ledger inside an invocation directory.
pub const LEDGER_FILE_NAME: &str = "summary.json";

/// Persisted form of a ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerDocument {
    pub target_version: DraftVersion,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub runs: Vec<Run>,
}

impl LedgerDocument {
    pub fn tally(&self) -> Tally {
        let passed = self
            .runs
            .iter()
            .filter(|run| run.status == RunStatus::Pass)
            .count();
        Tally {
            total: self.runs.len(),
            passed,
            failed: self.runs.len() - passed,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

impl Tally {
    /// Process exit status for an invocation with this tally.
    pub fn exit_code(&self) -> i32 {
        if self.failed == 0 { 0 } else { 1 }
    }
}

#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    document: LedgerDocument,
}

impl Ledger {
    /// Start an empty ledger at `path` and persist it immediately.
    pub fn create(
        path: impl Into<PathBuf>,
        target_version: DraftVersion,
        started_at: DateTime<Utc>,
    ) -> Result<Self> {
        let ledger = Self {
            path: path.into(),
            document: LedgerDocument {
                target_version,
                started_at,
                runs: Vec::new(),
            },
        };
        ledger.persist()?;
        Ok(ledger)
    }

    /// Start a ledger in a new timestamped directory under `results_dir`.
    pub fn create_in(results_dir: &Path, target_version: DraftVersion) -> Result<Self> {
        let started_at = Utc::now();
        let dir = claim_invocation_dir(results_dir, &started_at.format("%Y%m%d_%H%M%S").to_string())
            .map_err(|source| Error::LedgerError {
                path: results_dir.display().to_string(),
                source,
            })?;
        debug!("Recording results in {}", dir.display());
        Self::create(dir.join(LEDGER_FILE_NAME), target_version, started_at)
    }

    /// Read a persisted ledger back.
    pub fn load(path: &Path) -> Result<LedgerDocument> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Append `run` and make it durable before returning.
    ///
    /// On failure the in-memory ledger is left as it was, matching what is
    /// on disk.
    pub fn record(&mut self, run: Run) -> Result<()> {
        self.document.runs.push(run);
        if let Err(e) = self.persist() {
            self.document.runs.pop();
            return Err(e);
        }
        Ok(())
    }

    pub fn tally(&self) -> Tally {
        self.document.tally()
    }

    pub fn runs(&self) -> &[Run] {
        &self.document.runs
    }

    pub fn document(&self) -> &LedgerDocument {
        &self.document
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory holding the ledger and the run transcripts.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    fn persist(&self) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(&self.document)?;
        atomic_write(&self.path, &bytes).map_err(|source| Error::LedgerError {
            path: self.path.display().to_string(),
            source,
        })
    }
}

/// Create a directory no earlier invocation has used.
fn claim_invocation_dir(results_dir: &Path, stamp: &str) -> io::Result<PathBuf> {
    fs::create_dir_all(results_dir)?;
    let mut attempt = 0u32;
    loop {
        let name = if attempt == 0 {
            stamp.to_string()
        } else {
            format!("{stamp}_{attempt}")
        };
        let dir = results_dir.join(name);
        match fs::create_dir(&dir) {
            Ok(()) => return Ok(dir),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(e),
        }
    }
}
