//! Configuration management for interop-runner

mod settings;

pub use settings::{SETTINGS_FILE_NAME, Settings};

use crate::{
    error::{Error, Result},
    targets::TargetFilter,
    version::{DraftVersion, SelectionPolicy},
};

/// The resolved selection and filtering options of one invocation.
///
/// This is the CLI-agnostic entry record the orchestrator consumes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunConfig {
    pub filter: TargetFilter,
    /// Overrides the registry's `current_target` when set.
    pub target_version: Option<DraftVersion>,
    pub relay_filter: Option<String>,
    pub client_filter: Option<String>,
    pub policy: SelectionPolicy,
}

impl RunConfig {
    pub fn validate(&self) -> Result<()> {
        self.filter.validate()?;
        for (flag, value) in [("--relay", &self.relay_filter), ("--client", &self.client_filter)] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(Error::config(format!("{flag} must not be empty")));
            }
        }
        Ok(())
    }

    /// Explicit override first, then the registry default.
    pub fn effective_target(&self, registry_default: Option<DraftVersion>) -> Result<DraftVersion> {
        self.target_version.or(registry_default).ok_or_else(|| {
            Error::config(
                "no target version: pass --target-version or set current_target in the registry",
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_beats_registry_default() {
        let config = RunConfig {
            target_version: Some(DraftVersion::new(12)),
            ..Default::default()
        };
        assert_eq!(
            config.effective_target(Some(DraftVersion::new(14))).unwrap(),
            DraftVersion::new(12)
        );
        assert_eq!(
            RunConfig::default()
                .effective_target(Some(DraftVersion::new(14)))
                .unwrap(),
            DraftVersion::new(14)
        );
        assert!(RunConfig::default().effective_target(None).is_err());
    }

    #[test]
    fn test_validate_rejects_conflicting_modes_and_blank_filters() {
        let config = RunConfig {
            filter: TargetFilter {
                docker_only: true,
                remote_only: true,
                transport: None,
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RunConfig {
            relay_filter: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(RunConfig::default().validate().is_ok());
    }
}
