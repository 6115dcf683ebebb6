//! Effective configuration with provenance
//!
//! Captures the merged configuration plus where each layer came from.
//!
//! Building never fails. A config file that cannot be read or parsed, or an
//! environment value that cannot be interpreted, is recorded as an issue and
//! logged; the layer below keeps its value. [`EffectiveConfig::resolve`] is
//! the strict view used by `config`, [`EffectiveConfig::resolve_lenient`] the
//! one the attestation stages run with.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use tracing::warn;

use super::defaults::BuiltinDefaults;
use super::env::EnvSnapshot;
use super::merge::merge_layers;
use super::settings::AttestConfig;

/// Origin of a configuration source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    File,
    Env,
    Cli,
}

/// A contributing config source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSource {
    /// Origin of this source
    pub origin: ConfigOrigin,

    /// File path (None for builtin/env/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 digest of raw file bytes (None for builtin/env/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// Merged configuration plus its contributing sources
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    /// The merged configuration object
    pub config: Value,

    /// Contributing sources in precedence order
    pub sources: Vec<ConfigSource>,

    /// Problems found while building; each one fell back to a lower layer
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<ConfigError>,
}

impl EffectiveConfig {
    /// Build the effective config from all layers.
    ///
    /// A `config_file` that cannot be loaded is skipped and recorded in
    /// `issues`. The environment layer is only recorded as a source when it
    /// contributes at least one value.
    pub fn build(
        config_file: Option<&Path>,
        env: &EnvSnapshot,
        cli_overrides: Option<Value>,
    ) -> Self {
        let mut layers = Vec::new();
        let mut sources = Vec::new();
        let mut issues = Vec::new();

        // Layer 1: built-in defaults
        layers.push(BuiltinDefaults::default().to_value());
        sources.push(ConfigSource {
            origin: ConfigOrigin::Builtin,
            path: None,
            digest: None,
        });

        // Layer 2: config file
        if let Some(path) = config_file {
            match Self::load_toml_file(path) {
                Ok((value, digest)) => {
                    layers.push(value);
                    sources.push(ConfigSource {
                        origin: ConfigOrigin::File,
                        path: Some(path.to_string_lossy().to_string()),
                        digest: Some(digest),
                    });
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "config file skipped");
                    issues.push(e);
                }
            }
        }

        // Layer 3: environment
        if !env.is_empty() {
            let (overlay, env_issues) = env.to_overlay();
            for issue in &env_issues {
                warn!(error = %issue, "environment value ignored");
            }
            issues.extend(env_issues);
            layers.push(overlay);
            sources.push(ConfigSource {
                origin: ConfigOrigin::Env,
                path: None,
                digest: None,
            });
        }

        // Layer 4: CLI flags
        if let Some(cli) = cli_overrides {
            layers.push(cli);
            sources.push(ConfigSource {
                origin: ConfigOrigin::Cli,
                path: None,
                digest: None,
            });
        }

        Self {
            config: merge_layers(layers),
            sources,
            issues,
        }
    }

    /// Record a problem found outside the layers (e.g. an unparseable flag)
    pub fn add_issue(&mut self, issue: ConfigError) {
        warn!(error = %issue, "configuration value ignored");
        self.issues.push(issue);
    }

    /// Load and parse a TOML file, returning the value and digest
    fn load_toml_file(path: &Path) -> Result<(Value, String), ConfigError> {
        let bytes = fs::read(path)
            .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;

        let digest = hex::encode(Sha256::digest(&bytes));

        let contents = String::from_utf8(bytes)
            .map_err(|e| ConfigError::ParseError(format!("Invalid UTF-8: {}", e)))?;

        let toml_value: toml::Value = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(format!("TOML parse error: {}", e)))?;

        Ok((Self::toml_to_json(toml_value), digest))
    }

    /// Convert TOML Value to JSON Value
    fn toml_to_json(toml: toml::Value) -> Value {
        match toml {
            toml::Value::String(s) => Value::String(s),
            toml::Value::Integer(i) => Value::Number(i.into()),
            toml::Value::Float(f) => serde_json::Number::from_f64(f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            toml::Value::Boolean(b) => Value::Bool(b),
            toml::Value::Datetime(dt) => Value::String(dt.to_string()),
            toml::Value::Array(arr) => {
                Value::Array(arr.into_iter().map(Self::toml_to_json).collect())
            }
            toml::Value::Table(table) => Value::Object(
                table
                    .into_iter()
                    .map(|(k, v)| (k, Self::toml_to_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convert into the typed, validated configuration.
    ///
    /// Strict: the first recorded issue, type error or invalid value is
    /// returned as an error.
    pub fn resolve(&self) -> Result<AttestConfig, ConfigError> {
        if let Some(issue) = self.issues.first() {
            return Err(issue.clone());
        }
        let config: AttestConfig = serde_json::from_value(self.config.clone())
            .map_err(|e| ConfigError::ParseError(format!("invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Convert into the typed configuration, replacing every unusable value
    /// with its default.
    ///
    /// Returns the configuration plus all issues: those recorded while
    /// building and those found here. Each new issue is logged.
    pub fn resolve_lenient(&self) -> (AttestConfig, Vec<ConfigError>) {
        let mut issues = Vec::new();

        let mut config = AttestConfig {
            provenance: lenient_section("provenance", self.config.get("provenance"), &mut issues),
            health: lenient_section("health", self.config.get("health"), &mut issues),
            fingerprint: lenient_section(
                "fingerprint",
                self.config.get("fingerprint"),
                &mut issues,
            ),
        };
        issues.extend(config.sanitize());

        for issue in &issues {
            warn!(error = %issue, "default used");
        }

        let mut all = self.issues.clone();
        all.extend(issues);
        (config, all)
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

}

/// Deserialize one section key by key, dropping keys whose value does not
/// fit the type. Dropped keys keep the section default.
fn lenient_section<T>(name: &str, value: Option<&Value>, issues: &mut Vec<ConfigError>) -> T
where
    T: DeserializeOwned + Default,
{
    let fields = match value {
        None => return T::default(),
        Some(Value::Object(fields)) => fields,
        Some(other) => {
            issues.push(ConfigError::ValidationError(format!(
                "{} must be a table, got {}",
                name, other
            )));
            return T::default();
        }
    };

    let mut accepted = Map::new();
    for (key, field) in fields {
        let mut candidate = accepted.clone();
        candidate.insert(key.clone(), field.clone());
        match serde_json::from_value::<T>(Value::Object(candidate.clone())) {
            Ok(_) => accepted = candidate,
            Err(e) => issues.push(ConfigError::ParseError(format!("{}.{}: {}", name, key, e))),
        }
    }

    serde_json::from_value(Value::Object(accepted)).unwrap_or_default()
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::env::{ENV_ENVIRONMENT, ENV_REMOTE_BACKEND, ENV_VERSION};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_build_with_defaults_only() {
        let config = EffectiveConfig::build(None, &EnvSnapshot::default(), None);

        assert_eq!(config.config["provenance"]["version"], "0.0.0");
        assert_eq!(config.config["fingerprint"]["entry"], "index.html");
        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.sources[0].origin, ConfigOrigin::Builtin);
        assert!(config.issues.is_empty());
    }

    #[test]
    fn test_env_layer_recorded() {
        let env = EnvSnapshot::from_vars([(ENV_ENVIRONMENT, "staging")]);
        let config = EffectiveConfig::build(None, &env, None);

        assert_eq!(config.config["provenance"]["environment"], "staging");
        assert_eq!(config.sources.last().unwrap().origin, ConfigOrigin::Env);
    }

    #[test]
    fn test_cli_overrides_env() {
        let env = EnvSnapshot::from_vars([(ENV_REMOTE_BACKEND, "1")]);
        let cli = serde_json::json!({"provenance": {"remote_backend": false}});

        let config = EffectiveConfig::build(None, &env, Some(cli));

        assert_eq!(config.config["provenance"]["remote_backend"], false);
        assert_eq!(config.sources.len(), 3);
    }

    #[test]
    fn test_invalid_env_bool_recorded_as_issue() {
        let env = EnvSnapshot::from_vars([(ENV_REMOTE_BACKEND, "sometimes")]);
        let config = EffectiveConfig::build(None, &env, None);

        assert_eq!(config.config["provenance"]["remote_backend"], false);
        assert!(matches!(config.issues[..], [ConfigError::ValidationError(_)]));
        assert!(config.resolve().is_err());

        let (resolved, issues) = config.resolve_lenient();
        assert!(!resolved.provenance.remote_backend);
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn test_load_toml_file() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "[provenance]").unwrap();
        writeln!(temp, "version = \"3.0.1\"").unwrap();
        writeln!(temp, "[fingerprint]").unwrap();
        writeln!(temp, "entry = \"app.html\"").unwrap();

        let config = EffectiveConfig::build(Some(temp.path()), &EnvSnapshot::default(), None);

        assert_eq!(config.config["provenance"]["version"], "3.0.1");
        assert_eq!(config.config["fingerprint"]["entry"], "app.html");
        // untouched defaults survive
        assert_eq!(config.config["provenance"]["remote_backend"], false);

        let source = &config.sources[1];
        assert_eq!(source.origin, ConfigOrigin::File);
        assert_eq!(source.digest.as_ref().map(String::len), Some(64));
    }

    #[test]
    fn test_missing_config_file_skipped() {
        let config = EffectiveConfig::build(
            Some(Path::new("/nonexistent/attest.toml")),
            &EnvSnapshot::default(),
            None,
        );

        assert_eq!(config.sources.len(), 1);
        assert!(matches!(config.issues[..], [ConfigError::IoError(_)]));
        assert!(matches!(config.resolve(), Err(ConfigError::IoError(_))));
    }

    #[test]
    fn test_malformed_toml_skipped() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "[provenance").unwrap();
        let env = EnvSnapshot::from_vars([(ENV_ENVIRONMENT, "qa")]);

        let config = EffectiveConfig::build(Some(temp.path()), &env, None);

        assert!(matches!(config.issues[..], [ConfigError::ParseError(_)]));
        // layers above the broken file still apply
        let (resolved, _) = config.resolve_lenient();
        assert_eq!(resolved.provenance.environment.as_deref(), Some("qa"));
        assert_eq!(resolved.fingerprint.entry, "index.html");
    }

    #[test]
    fn test_resolve_defaults() {
        let config = EffectiveConfig::build(None, &EnvSnapshot::default(), None)
            .resolve()
            .unwrap();

        assert_eq!(config.provenance.version, "0.0.0");
        assert_eq!(config.provenance.source_revision, None);
        assert_eq!(config.health.required.len(), 3);
        assert_eq!(config.fingerprint.entry, "index.html");
    }

    #[test]
    fn test_resolve_rejects_bad_version() {
        let cli = serde_json::json!({"provenance": {"version": "v1"}});
        let result = EffectiveConfig::build(None, &EnvSnapshot::default(), Some(cli)).resolve();

        let err = result.unwrap_err();
        assert!(err.to_string().contains("semantic version"));
    }

    #[test]
    fn test_lenient_replaces_bad_version() {
        let env = EnvSnapshot::from_vars([(ENV_VERSION, "latest"), (ENV_ENVIRONMENT, "qa")]);
        let (config, issues) = EffectiveConfig::build(None, &env, None).resolve_lenient();

        assert_eq!(config.provenance.version, "0.0.0");
        assert_eq!(config.provenance.environment.as_deref(), Some("qa"));
        assert_eq!(issues.len(), 1);
        assert!(issues[0].to_string().contains("latest"));
    }

    #[test]
    fn test_resolve_rejects_wrong_type() {
        let cli = serde_json::json!({"provenance": {"remote_backend": "yes"}});
        let result = EffectiveConfig::build(None, &EnvSnapshot::default(), Some(cli)).resolve();

        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_lenient_drops_wrong_type_only() {
        let cli = serde_json::json!({
            "provenance": {"remote_backend": "yes", "source_revision": "abc"},
            "fingerprint": {"entry": 42},
            "health": "none"
        });
        let (config, issues) =
            EffectiveConfig::build(None, &EnvSnapshot::default(), Some(cli)).resolve_lenient();

        assert!(!config.provenance.remote_backend);
        assert_eq!(config.provenance.source_revision.as_deref(), Some("abc"));
        assert_eq!(config.fingerprint.entry, "index.html");
        assert_eq!(config.health.required.len(), 3);
        assert_eq!(issues.len(), 3);
    }

    #[test]
    fn test_issues_serialized_with_kind() {
        let env = EnvSnapshot::from_vars([(ENV_REMOTE_BACKEND, "maybe")]);
        let config = EffectiveConfig::build(None, &env, None);
        let value: Value = serde_json::from_str(&config.to_json().unwrap()).unwrap();

        assert_eq!(value["issues"][0]["kind"], "validation_error");
        assert!(value["issues"][0]["message"].as_str().unwrap().contains("maybe"));
    }
}
