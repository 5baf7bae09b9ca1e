//! Pairwise scheduling of clients against relays.

use crate::{
    config::RunConfig,
    error::{Error, Result},
    executor::{RunExecutor, RunRequest},
    ledger::{Ledger, Tally},
    registry::{Registry, Role},
    targets::{RunTarget, enumerate_targets},
    types::Pair,
    version::{DraftVersion, SelectionPolicy},
};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// What happens to one pair in this invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairDecision {
    /// No shared draft version; the pair gets no runs at all.
    Skipped,
    Selected {
        versions: Vec<DraftVersion>,
        targets: Vec<RunTarget>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedPair {
    pub pair: Pair,
    pub decision: PairDecision,
}

/// Every decision of an invocation, computed without running anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub target_version: DraftVersion,
    pub pairs: Vec<PlannedPair>,
}

impl Plan {
    pub fn run_count(&self) -> usize {
        self.pairs
            .iter()
            .map(|planned| match &planned.decision {
                PairDecision::Skipped => 0,
                PairDecision::Selected { versions, targets } => versions.len() * targets.len(),
            })
            .sum()
    }

    pub fn skipped(&self) -> impl Iterator<Item = &Pair> {
        self.pairs
            .iter()
            .filter(|planned| planned.decision == PairDecision::Skipped)
            .map(|planned| &planned.pair)
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "target {}", self.target_version)?;
        for planned in &self.pairs {
            match &planned.decision {
                PairDecision::Skipped => {
                    writeln!(f, "skip {} (no shared draft version)", planned.pair)?;
                }
                PairDecision::Selected { versions, targets } => {
                    let versions: Vec<String> = versions.iter().map(|v| v.to_string()).collect();
                    writeln!(f, "{} @ {}", planned.pair, versions.join(", "))?;
                    if targets.is_empty() {
                        writeln!(f, "  (no matching targets)")?;
                    }
                    for target in targets {
                        writeln!(f, "  {target}")?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Outcome of a full invocation.
#[derive(Debug, Clone)]
pub struct Summary {
    pub target_version: DraftVersion,
    pub tally: Tally,
    pub skipped: Vec<Pair>,
    pub ledger_path: PathBuf,
    pub cancelled: bool,
}

impl Summary {
    pub fn exit_code(&self) -> i32 {
        self.tally.exit_code()
    }
}

pub struct Orchestrator<'a> {
    registry: &'a Registry,
    config: RunConfig,
    target_version: DraftVersion,
}

impl<'a> Orchestrator<'a> {
    /// Validate the configuration against the registry before any run.
    pub fn new(registry: &'a Registry, config: RunConfig) -> Result<Self> {
        config.validate()?;
        let target_version = config.effective_target(registry.current_target)?;
        check_filter(registry, config.relay_filter.as_deref(), Role::Relay)?;
        check_filter(registry, config.client_filter.as_deref(), Role::Client)?;
        debug!("Target version resolved to {target_version}");
        Ok(Self {
            registry,
            config,
            target_version,
        })
    }

    pub fn target_version(&self) -> DraftVersion {
        self.target_version
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Clients × relays after the name filters, in registry key order.
    pub fn pairs(&self) -> Vec<Pair> {
        let clients = self
            .registry
            .clients()
            .filter(|(key, _)| matches_filter(key, self.config.client_filter.as_deref()));
        let relays: Vec<&str> = self
            .registry
            .relays()
            .filter(|(key, _)| matches_filter(key, self.config.relay_filter.as_deref()))
            .map(|(key, _)| key)
            .collect();

        clients
            .flat_map(|(client, _)| relays.iter().map(move |relay| Pair::new(client, *relay)))
            .collect()
    }

    pub fn decide(&self, pair: &Pair) -> PairDecision {
        let (Some(client), Some(relay)) =
            (self.registry.get(&pair.client), self.registry.get(&pair.relay))
        else {
            return PairDecision::Skipped;
        };
        let Some(relay_targets) = relay.role(Role::Relay) else {
            return PairDecision::Skipped;
        };

        let versions = self.config.policy.versions(
            &client.draft_versions,
            &relay.draft_versions,
            self.target_version,
        );
        if versions.is_empty() {
            return PairDecision::Skipped;
        }
        PairDecision::Selected {
            versions,
            targets: enumerate_targets(relay_targets, &self.config.filter),
        }
    }

    /// List-only mode: the decisions `run` would act on.
    pub fn plan(&self) -> Plan {
        Plan {
            target_version: self.target_version,
            pairs: self
                .pairs()
                .into_iter()
                .map(|pair| {
                    let decision = self.decide(&pair);
                    PlannedPair { pair, decision }
                })
                .collect(),
        }
    }

    /// Execute every selected (pair, version, target) and record it.
    ///
    /// Only ledger write failures abort; run failures are recorded.
    pub fn run(&self, executor: &RunExecutor, ledger: &mut Ledger) -> Result<Summary> {
        if ledger.document().target_version != self.target_version {
            return Err(Error::config(format!(
                "ledger was created for {} but the invocation targets {}",
                ledger.document().target_version,
                self.target_version
            )));
        }

        let cancel = executor.cancel_flag();
        let mut seen: HashSet<(Pair, Option<DraftVersion>)> = HashSet::new();
        let mut ordinals: HashMap<String, usize> = HashMap::new();
        let mut skipped = Vec::new();

        info!(
            "Testing at {} ({} policy), recording to {}",
            self.target_version,
            policy_name(self.config.policy),
            ledger.path().display()
        );

        'pairs: for pair in self.pairs() {
            if cancel.is_cancelled() {
                break;
            }
            let (versions, targets) = match self.decide(&pair) {
                PairDecision::Skipped => {
                    info!("Skipping {pair}: no shared draft version");
                    skipped.push(pair);
                    continue;
                }
                PairDecision::Selected { versions, targets } => (versions, targets),
            };
            let client_image = self
                .registry
                .get(&pair.client)
                .and_then(|client| client.role(Role::Client))
                .and_then(|client| client.image());

            for version in versions {
                if !seen.insert(self.seen_key(&pair, version)) {
                    debug!("Already visited {pair} at {version}");
                    continue;
                }
                if targets.is_empty() {
                    warn!("{pair}: relay has no targets matching the filters");
                }
                for target in &targets {
                    if cancel.is_cancelled() {
                        break 'pairs;
                    }
                    let mut request = RunRequest {
                        pair: &pair,
                        client_image,
                        version,
                        target,
                        ordinal: 0,
                    };
                    let ordinal = ordinals.entry(request.log_stem()).or_insert(0);
                    request.ordinal = *ordinal;
                    *ordinal += 1;
                    ledger.record(executor.execute(&request))?;
                }
            }
        }

        let cancelled = cancel.is_cancelled();
        if cancelled {
            warn!("Interrupted; {} runs recorded", ledger.tally().total);
        }

        Ok(Summary {
            target_version: self.target_version,
            tally: ledger.tally(),
            skipped,
            ledger_path: ledger.path().to_path_buf(),
            cancelled,
        })
    }

    fn seen_key(&self, pair: &Pair, version: DraftVersion) -> (Pair, Option<DraftVersion>) {
        match self.config.policy {
            SelectionPolicy::Single => (pair.clone(), None),
            SelectionPolicy::Sweep => (pair.clone(), Some(version)),
        }
    }
}

fn policy_name(policy: SelectionPolicy) -> &'static str {
    match policy {
        SelectionPolicy::Single => "single",
        SelectionPolicy::Sweep => "sweep",
    }
}

fn matches_filter(key: &str, filter: Option<&str>) -> bool {
    filter.is_none_or(|wanted| wanted == key)
}

fn check_filter(registry: &Registry, filter: Option<&str>, role: Role) -> Result<()> {
    let Some(key) = filter else {
        return Ok(());
    };
    match registry.get(key) {
        Some(implementation) if implementation.has_role(role) => Ok(()),
        Some(_) => Err(Error::config(format!("'{key}' does not declare a {role} role"))),
        None => Err(Error::config(format!("unknown {role} '{key}'"))),
    }
}
