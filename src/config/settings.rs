//! Typed configuration consumed by the pipeline stages

use serde::{Deserialize, Serialize};
use std::path::{Component, Path};

use super::defaults::{DEFAULT_ENTRY_FILE, DEFAULT_VERSION};
use super::effective::ConfigError;
use crate::health::RequiredEntry;
use crate::provenance::ProvenanceConfig;

/// Complete configuration for one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestConfig {
    #[serde(default)]
    pub provenance: ProvenanceConfig,

    #[serde(default)]
    pub health: HealthConfig,

    #[serde(default)]
    pub fingerprint: FingerprintConfig,
}

/// Structural health check settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Entries that must exist in the artifact directory
    pub required: Vec<RequiredEntry>,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            required: RequiredEntry::defaults(),
        }
    }
}

/// Integrity fingerprint settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FingerprintConfig {
    /// Entry file, relative to the artifact directory
    pub entry: String,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            entry: DEFAULT_ENTRY_FILE.to_string(),
        }
    }
}

impl AttestConfig {
    /// Validate configuration values, reporting the first problem
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.clone().sanitize().into_iter().next() {
            Some(issue) => Err(issue),
            None => Ok(()),
        }
    }

    /// Replace invalid values with their defaults and return one issue per
    /// replacement. Invalid required entries are dropped.
    pub fn sanitize(&mut self) -> Vec<ConfigError> {
        let mut issues = Vec::new();

        if !is_semver(&self.provenance.version) {
            issues.push(ConfigError::ValidationError(format!(
                "provenance.version must be a semantic version (MAJOR.MINOR.PATCH), got '{}'",
                self.provenance.version
            )));
            self.provenance.version = DEFAULT_VERSION.to_string();
        }

        let mut index = 0;
        self.health.required.retain(|entry| {
            let i = index;
            index += 1;
            if entry.check.trim().is_empty() {
                issues.push(ConfigError::ValidationError(format!(
                    "health.required[{}].check must not be empty",
                    i
                )));
                false
            } else if !is_contained_relative(&entry.path) {
                issues.push(ConfigError::ValidationError(format!(
                    "health.required[{}].path must stay inside the artifact directory, got '{}'",
                    i, entry.path
                )));
                false
            } else {
                true
            }
        });

        if !is_contained_relative(&self.fingerprint.entry) {
            issues.push(ConfigError::ValidationError(format!(
                "fingerprint.entry must stay inside the artifact directory, got '{}'",
                self.fingerprint.entry
            )));
            self.fingerprint.entry = DEFAULT_ENTRY_FILE.to_string();
        }

        issues
    }
}

/// Non-empty relative path made only of normal components (no `..`, no root)
fn is_contained_relative(path: &str) -> bool {
    !path.trim().is_empty()
        && Path::new(path)
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Check `MAJOR.MINOR.PATCH[-PRERELEASE][+BUILD]`
pub fn is_semver(version: &str) -> bool {
    let (rest, build) = match version.split_once('+') {
        Some((rest, build)) => (rest, Some(build)),
        None => (version, None),
    };
    let (core, pre) = match rest.split_once('-') {
        Some((core, pre)) => (core, Some(pre)),
        None => (rest, None),
    };

    let numeric = |part: &str| {
        !part.is_empty()
            && part.bytes().all(|b| b.is_ascii_digit())
            && (part == "0" || !part.starts_with('0'))
    };
    let identifiers = |s: &str| {
        s.split('.').all(|id| {
            !id.is_empty() && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
        })
    };

    let parts: Vec<&str> = core.split('.').collect();
    parts.len() == 3
        && parts.iter().all(|p| numeric(*p))
        && pre.map_or(true, identifiers)
        && build.map_or(true, identifiers)
}
