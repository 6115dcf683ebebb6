//! Configuration layering
//!
//! Implements the 4-layer configuration merge:
//! 1. Built-in defaults
//! 2. Config file (--config, or ./attest.toml when present)
//! 3. Environment snapshot (BUILD_* variables)
//! 4. CLI flags

mod defaults;
mod effective;
mod env;
mod merge;
mod settings;

pub use defaults::{BuiltinDefaults, DEFAULT_ENTRY_FILE, DEFAULT_REQUIRED_ENTRIES, DEFAULT_VERSION};
pub use effective::{ConfigError, ConfigOrigin, ConfigSource, EffectiveConfig};
pub use env::{
    parse_bool, EnvSnapshot, ENV_ENVIRONMENT, ENV_REMOTE_BACKEND, ENV_SOURCE_REVISION, ENV_VERSION,
};
pub use merge::{deep_merge, merge_layers};
pub use settings::{is_semver, AttestConfig, FingerprintConfig, HealthConfig};

/// Config file picked up from the working directory when --config is absent
pub const DEFAULT_CONFIG_FILE: &str = "attest.toml";
