//! build-attest - post-build attestation for static build output
//!
//! Inspects a finished build directory and writes sidecar files next to it:
//! - `version.json`: provenance (version, build time, revision, environment, flags)
//! - `health.txt`: structural health (are the expected outputs present)
//! - `<entry>.sha256` / `<entry>.sha1`: integrity fingerprints of the entry file

pub mod config;
pub mod fingerprint;
pub mod health;
pub mod logging;
pub mod pipeline;
pub mod provenance;
pub mod summary;

pub use config::{AttestConfig, ConfigError, EffectiveConfig, EnvSnapshot};
pub use fingerprint::{fingerprint, verify_fingerprints, FingerprintOutcome, FingerprintPair};
pub use health::{check_health, run_health_check, HealthDescriptor, HealthStatus, RequiredEntry};
pub use pipeline::{Pipeline, PipelineError};
pub use provenance::{record_provenance, ProvenanceConfig, VersionDescriptor};
pub use summary::{ExitCode, RunSummary, StageKind, StageOutcome};
