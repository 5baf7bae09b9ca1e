//! Draft version identifiers and the per-pair version selection policy.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

const DRAFT_PREFIX: &str = "draft-";

/// A protocol draft revision, ordered by its embedded number.
///
/// Parses from `"draft-14"`, `"draft-7"` or a bare `"14"` and always renders
/// with the two-digit revision of IETF draft names (`"draft-07"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DraftVersion(u32);

impl DraftVersion {
    pub const fn new(number: u32) -> Self {
        Self(number)
    }

    pub const fn number(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for DraftVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{DRAFT_PREFIX}{:02}", self.0)
    }
}

impl FromStr for DraftVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix(DRAFT_PREFIX).unwrap_or(trimmed);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::VersionError(s.to_string()));
        }
        digits
            .parse()
            .map(Self)
            .map_err(|_| Error::VersionError(s.to_string()))
    }
}

impl Serialize for DraftVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DraftVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// How many versions a pair is exercised at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// One version per pair, chosen by [`select_version`].
    #[default]
    Single,
    /// Every shared version, ordered by [`sweep_versions`].
    Sweep,
}

impl SelectionPolicy {
    pub fn versions(
        self,
        client: &BTreeSet<DraftVersion>,
        relay: &BTreeSet<DraftVersion>,
        target: DraftVersion,
    ) -> Vec<DraftVersion> {
        match self {
            SelectionPolicy::Single => select_version(client, relay, target).into_iter().collect(),
            SelectionPolicy::Sweep => sweep_versions(client, relay, target),
        }
    }
}

/// Pick the version a (client, relay) pair is tested at.
///
/// Preference order: the target itself, then the closest shared version
/// below it, then the closest shared version above it. `None` means the two
/// sides share nothing and the pair is skipped.
pub fn select_version(
    client: &BTreeSet<DraftVersion>,
    relay: &BTreeSet<DraftVersion>,
    target: DraftVersion,
) -> Option<DraftVersion> {
    let shared: BTreeSet<DraftVersion> = client.intersection(relay).copied().collect();
    if shared.is_empty() {
        return None;
    }
    if shared.contains(&target) {
        return Some(target);
    }
    if let Some(below) = shared.range(..target).next_back() {
        return Some(*below);
    }
    shared.range(target..).next().copied()
}

/// All shared versions: target first, then descending below it, then
/// ascending above it.
pub fn sweep_versions(
    client: &BTreeSet<DraftVersion>,
    relay: &BTreeSet<DraftVersion>,
    target: DraftVersion,
) -> Vec<DraftVersion> {
    let shared: BTreeSet<DraftVersion> = client.intersection(relay).copied().collect();
    let mut ordered = Vec::with_capacity(shared.len());
    if shared.contains(&target) {
        ordered.push(target);
    }
    ordered.extend(shared.range(..target).rev().copied());
    ordered.extend(
        shared
            .range(target..)
            .copied()
            .filter(|v| *v != target),
    );
    ordered
}
