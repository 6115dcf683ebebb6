//! Version descriptor (version.json)
//!
//! Records what produced a build: semantic version, build time, source
//! revision, environment name and feature flags. Keys are camelCase because
//! the file is consumed by web tooling.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use crate::config::DEFAULT_VERSION;

/// Revision recorded when no revision override is available
pub const UNKNOWN_REVISION: &str = "unknown";

/// Environment recorded when no environment override is available
pub const DEFAULT_ENVIRONMENT: &str = "production";

/// The one feature flag controlled by the caller
pub const REMOTE_BACKEND_FLAG: &str = "remoteBackend";

/// Capabilities every build produced by this pipeline declares.
///
/// These are always reported as `true`. They are a static declaration about
/// the build pipeline, not something detected in the artifact directory.
pub const STATIC_CAPABILITIES: &[&str] =
    &["offlineCache", "installable", "integrityFingerprints"];

/// Explicit inputs for the provenance recorder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceConfig {
    /// Semantic version of the build
    #[serde(default = "default_version")]
    pub version: String,

    /// Source revision override; absent or blank means `unknown`
    #[serde(default)]
    pub source_revision: Option<String>,

    /// Environment override; absent or blank means `production`
    #[serde(default)]
    pub environment: Option<String>,

    /// Backend-selection flag
    #[serde(default)]
    pub remote_backend: bool,
}

fn default_version() -> String {
    DEFAULT_VERSION.to_string()
}

impl Default for ProvenanceConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            source_revision: None,
            environment: None,
            remote_backend: false,
        }
    }
}

/// Build the feature flag map: the caller-controlled flag plus the static
/// capability declaration.
pub fn feature_flags(remote_backend: bool) -> BTreeMap<String, bool> {
    let mut flags: BTreeMap<String, bool> = STATIC_CAPABILITIES
        .iter()
        .map(|name| (name.to_string(), true))
        .collect();
    flags.insert(REMOTE_BACKEND_FLAG.to_string(), remote_backend);
    flags
}

/// Version descriptor (version.json)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionDescriptor {
    /// Semantic version
    pub version: String,

    /// When the descriptor was created
    #[serde(with = "rfc3339_millis")]
    pub build_timestamp: DateTime<Utc>,

    /// Source revision, or `unknown`
    pub source_revision: String,

    /// Environment name, or `production`
    pub environment: String,

    /// Feature flags (always four entries)
    pub feature_flags: BTreeMap<String, bool>,
}

impl VersionDescriptor {
    /// Create a descriptor stamped with the given time, truncated to milliseconds
    pub fn new(config: &ProvenanceConfig, build_timestamp: DateTime<Utc>) -> Self {
        Self {
            version: config.version.clone(),
            build_timestamp: build_timestamp.trunc_subsecs(3),
            source_revision: non_blank(config.source_revision.as_deref())
                .unwrap_or(UNKNOWN_REVISION)
                .to_string(),
            environment: non_blank(config.environment.as_deref())
                .unwrap_or(DEFAULT_ENVIRONMENT)
                .to_string(),
            feature_flags: feature_flags(config.remote_backend),
        }
    }

    /// Whether the source revision fell back to the sentinel
    pub fn revision_is_unknown(&self) -> bool {
        self.source_revision == UNKNOWN_REVISION
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load from file
    pub fn from_file(path: &Path) -> io::Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("JSON error: {}", e)))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// RFC 3339 with exactly three fractional digits and a `Z` suffix, the same
/// shape `health.txt` uses
mod rfc3339_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
