//! Environment snapshot (layer 3)
//!
//! The process environment is read exactly once, in `main`, into an
//! [`EnvSnapshot`]. Everything downstream works from the snapshot, so tests
//! inject values instead of mutating process state.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::effective::ConfigError;

/// Source revision override (commit SHA or any opaque revision string)
pub const ENV_SOURCE_REVISION: &str = "BUILD_SOURCE_REVISION";

/// Environment name override (e.g. "staging")
pub const ENV_ENVIRONMENT: &str = "BUILD_ENVIRONMENT";

/// Backend-selection flag
pub const ENV_REMOTE_BACKEND: &str = "BUILD_REMOTE_BACKEND";

/// Semantic version override
pub const ENV_VERSION: &str = "BUILD_VERSION";

/// Variables this crate consults
pub const RECOGNIZED_VARS: &[&str] = &[
    ENV_SOURCE_REVISION,
    ENV_ENVIRONMENT,
    ENV_REMOTE_BACKEND,
    ENV_VERSION,
];

/// Immutable copy of the environment variables relevant to a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    vars: BTreeMap<String, String>,
}

impl EnvSnapshot {
    /// Capture the recognized variables from the process environment.
    ///
    /// Variables that are not valid UTF-8 are treated as unset.
    pub fn capture() -> Self {
        Self::from_vars(
            RECOGNIZED_VARS
                .iter()
                .filter_map(|key| std::env::var(key).ok().map(|value| (*key, value))),
        )
    }

    /// Build a snapshot from explicit key/value pairs
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Look up a variable
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Whether no recognized variable is set
    pub fn is_empty(&self) -> bool {
        RECOGNIZED_VARS.iter().all(|key| self.get(key).is_none())
    }

    /// Convert to a config overlay.
    ///
    /// Revision and environment are passed through verbatim, empty strings
    /// included; the descriptor applies the fallbacks. An empty version is
    /// treated as unset. A flag that is not a boolean is left out of the
    /// overlay and returned as an issue.
    pub fn to_overlay(&self) -> (Value, Vec<ConfigError>) {
        let mut provenance = Map::new();
        let mut issues = Vec::new();

        if let Some(revision) = self.get(ENV_SOURCE_REVISION) {
            provenance.insert("source_revision".to_string(), Value::from(revision));
        }
        if let Some(environment) = self.get(ENV_ENVIRONMENT) {
            provenance.insert("environment".to_string(), Value::from(environment));
        }
        if let Some(raw) = self.get(ENV_REMOTE_BACKEND) {
            match parse_bool(ENV_REMOTE_BACKEND, raw) {
                Ok(flag) => {
                    provenance.insert("remote_backend".to_string(), Value::Bool(flag));
                }
                Err(e) => issues.push(e),
            }
        }
        if let Some(version) = self.get(ENV_VERSION).map(str::trim) {
            if !version.is_empty() {
                provenance.insert("version".to_string(), Value::from(version));
            }
        }

        if provenance.is_empty() {
            return (Value::Object(Map::new()), issues);
        }
        (serde_json::json!({ "provenance": provenance }), issues)
    }
}

/// Parse a boolean flag value.
///
/// Accepts `1/true/yes/on` and `0/false/no/off` case-insensitively; an empty
/// value is `false`.
pub fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::ValidationError(format!(
            "{} must be a boolean (true/false, 1/0, yes/no, on/off), got '{}'",
            key, other
        ))),
    }
}
