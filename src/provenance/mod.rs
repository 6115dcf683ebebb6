//! Provenance recorder
//!
//! Writes `version.json` into the artifact directory, replacing any
//! previous descriptor wholesale.

mod descriptor;

pub use descriptor::{
    feature_flags, ProvenanceConfig, VersionDescriptor, DEFAULT_ENVIRONMENT, REMOTE_BACKEND_FLAG,
    STATIC_CAPABILITIES, UNKNOWN_REVISION,
};

use chrono::Utc;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File name of the version descriptor sidecar
pub const VERSION_FILE: &str = "version.json";

/// Errors from the provenance recorder
#[derive(Debug, thiserror::Error)]
pub enum ProvenanceError {
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Record provenance for the build in `artifact_dir`.
///
/// The caller guarantees the directory exists. Missing overrides never fail
/// the stage; only serialization or the write can.
pub fn record_provenance(
    artifact_dir: &Path,
    config: &ProvenanceConfig,
) -> Result<VersionDescriptor, ProvenanceError> {
    let descriptor = VersionDescriptor::new(config, Utc::now());
    let json = descriptor.to_json()?;

    let path = artifact_dir.join(VERSION_FILE);
    fs::write(&path, json).map_err(|source| ProvenanceError::Write {
        path: path.clone(),
        source,
    })?;

    debug!(path = %path.display(), "wrote version descriptor");
    if descriptor.revision_is_unknown() {
        info!("no source revision supplied, recorded as {}", UNKNOWN_REVISION);
    }
    info!(
        version = %descriptor.version,
        revision = %descriptor.source_revision,
        environment = %descriptor.environment,
        "provenance recorded"
    );

    Ok(descriptor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_record_writes_descriptor() {
        let dir = TempDir::new().unwrap();
        let config = ProvenanceConfig {
            source_revision: Some("abc123".to_string()),
            ..ProvenanceConfig::default()
        };

        let descriptor = record_provenance(dir.path(), &config).unwrap();
        let loaded = VersionDescriptor::from_file(&dir.path().join(VERSION_FILE)).unwrap();

        assert_eq!(loaded, descriptor);
        assert_eq!(loaded.source_revision, "abc123");
    }

    #[test]
    fn test_record_overwrites_previous() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(VERSION_FILE),
            r#"{"version":"9.9.9","legacyField":true}"#,
        )
        .unwrap();

        record_provenance(dir.path(), &ProvenanceConfig::default()).unwrap();

        let raw = fs::read_to_string(dir.path().join(VERSION_FILE)).unwrap();
        assert!(!raw.contains("legacyField"));
        assert!(raw.contains(r#""version": "0.0.0""#));
    }

    #[test]
    fn test_record_write_failure() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("not-created");

        let err = record_provenance(&missing, &ProvenanceConfig::default()).unwrap_err();
        assert!(matches!(err, ProvenanceError::Write { .. }));
        assert!(err.to_string().contains(VERSION_FILE));
    }
}
