//! Built-in defaults (layer 1)
//!
//! Hardcoded defaults for every configuration value.

use serde::{Deserialize, Serialize};

/// Version recorded when no version is configured
pub const DEFAULT_VERSION: &str = "0.0.0";

/// Primary HTML entry point of a static build
pub const DEFAULT_ENTRY_FILE: &str = "index.html";

/// Required entries as (check name, path relative to the artifact directory)
pub const DEFAULT_REQUIRED_ENTRIES: &[(&str, &str)] = &[
    ("build", "index.html"),
    ("manifest", "manifest.webmanifest"),
    ("assets", "assets"),
];

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Semantic version of the build (default: "0.0.0")
    pub version: String,

    /// Backend-selection flag (default: false)
    pub remote_backend: bool,

    /// Entries the health checker requires
    pub required: Vec<(String, String)>,

    /// Entry file to fingerprint (default: "index.html")
    pub entry: String,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            version: DEFAULT_VERSION.to_string(),
            remote_backend: false,
            required: DEFAULT_REQUIRED_ENTRIES
                .iter()
                .map(|(check, path)| (check.to_string(), path.to_string()))
                .collect(),
            entry: DEFAULT_ENTRY_FILE.to_string(),
        }
    }
}

impl BuiltinDefaults {
    /// Convert to JSON Value for merging
    ///
    /// `source_revision` and `environment` have no entry here; their
    /// fallbacks apply when the version descriptor is built.
    pub fn to_value(&self) -> serde_json::Value {
        let required: Vec<serde_json::Value> = self
            .required
            .iter()
            .map(|(check, path)| serde_json::json!({ "check": check, "path": path }))
            .collect();

        serde_json::json!({
            "provenance": {
                "version": self.version,
                "remote_backend": self.remote_backend
            },
            "health": {
                "required": required
            },
            "fingerprint": {
                "entry": self.entry
            }
        })
    }
}
