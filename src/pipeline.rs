//! Pipeline driver
//!
//! Runs the three attestation stages over one artifact directory:
//! - Provenance: version.json
//! - Health: health.txt
//! - Fingerprint: <entry>.sha256 / <entry>.sha1
//!
//! The only hard failure is a missing artifact directory, detected before
//! anything is written. After that every stage runs; a failed stage is
//! recorded in the summary and the next stage still executes.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{AttestConfig, ConfigError};
use crate::fingerprint::{fingerprint, sidecar_path, DigestAlgorithm, FingerprintOutcome};
use crate::health::{run_health_check, HealthRun, HEALTH_FILE};
use crate::provenance::{record_provenance, VERSION_FILE};
use crate::summary::{ExitCode, RunSummary, StageKind, StageOutcome, StageReport};

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("artifact directory does not exist: {}", .0.display())]
    MissingArtifactDir(PathBuf),

    #[error("artifact path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl PipelineError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> ExitCode {
        match self {
            PipelineError::MissingArtifactDir(_) | PipelineError::NotADirectory(_) => {
                ExitCode::MissingArtifactDir
            }
            PipelineError::Config(_) => ExitCode::Config,
        }
    }
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Fail unless `artifact_dir` exists and is a directory
pub fn check_artifact_dir(artifact_dir: &Path) -> PipelineResult<()> {
    match std::fs::metadata(artifact_dir) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(PipelineError::NotADirectory(artifact_dir.to_path_buf())),
        Err(_) => Err(PipelineError::MissingArtifactDir(artifact_dir.to_path_buf())),
    }
}

/// One attestation run over one artifact directory
#[derive(Debug, Clone)]
pub struct Pipeline {
    artifact_dir: PathBuf,
    config: AttestConfig,
}

impl Pipeline {
    pub fn new(artifact_dir: impl Into<PathBuf>, config: AttestConfig) -> Self {
        Self {
            artifact_dir: artifact_dir.into(),
            config,
        }
    }

    pub fn artifact_dir(&self) -> &Path {
        &self.artifact_dir
    }

    pub fn config(&self) -> &AttestConfig {
        &self.config
    }

    /// The artifact directory must exist and be a directory
    pub fn check_precondition(&self) -> PipelineResult<()> {
        check_artifact_dir(&self.artifact_dir)
    }

    /// Run all stages without progress callbacks
    pub fn run(&self) -> PipelineResult<RunSummary> {
        self.run_with(|_| {})
    }

    /// Run all stages, calling `on_stage` after each one
    pub fn run_with<F>(&self, mut on_stage: F) -> PipelineResult<RunSummary>
    where
        F: FnMut(&StageReport),
    {
        self.check_precondition()?;

        let start = Instant::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        let mut summary = RunSummary::new(run_id.clone(), &self.artifact_dir, Utc::now());

        info!(run_id = %run_id, artifact_dir = %self.artifact_dir.display(), "attestation started");

        for stage in StageKind::ORDER {
            let outcome = match stage {
                StageKind::Provenance => self.run_provenance(&mut summary),
                StageKind::Health => self.run_health(&mut summary),
                StageKind::Fingerprint => self.run_fingerprint(&mut summary),
            };

            if let StageOutcome::Failed { error } = &outcome {
                warn!(stage = %stage, error = %error, "stage failed, continuing");
            }

            summary.record(stage, outcome);
            if let Some(report) = summary.stages.last() {
                on_stage(report);
            }
        }

        let summary = summary.finish(start.elapsed().as_millis() as u64);
        info!(
            run_id = %run_id,
            failed = summary.stages_failed(),
            skipped = summary.stages_skipped(),
            "attestation finished"
        );
        Ok(summary)
    }

    fn run_provenance(&self, summary: &mut RunSummary) -> StageOutcome {
        match record_provenance(&self.artifact_dir, &self.config.provenance) {
            Ok(descriptor) => {
                let detail = format!(
                    "wrote {} (version {}, revision {}, environment {})",
                    VERSION_FILE,
                    descriptor.version,
                    descriptor.source_revision,
                    descriptor.environment
                );
                summary.version = Some(descriptor);
                StageOutcome::Succeeded { detail }
            }
            Err(e) => StageOutcome::Failed {
                error: e.to_string(),
            },
        }
    }

    fn run_health(&self, summary: &mut RunSummary) -> StageOutcome {
        let HealthRun {
            descriptor,
            written,
        } = run_health_check(&self.artifact_dir, &self.config.health.required);

        let outcome = match written {
            Ok(_) if descriptor.is_healthy() => StageOutcome::Succeeded {
                detail: format!("wrote {} (status {})", HEALTH_FILE, descriptor.status),
            },
            Ok(_) => StageOutcome::Succeeded {
                detail: format!(
                    "wrote {} (status {}; missing: {})",
                    HEALTH_FILE,
                    descriptor.status,
                    descriptor.missing().join(", ")
                ),
            },
            Err(e) => StageOutcome::Failed {
                error: e.to_string(),
            },
        };

        // the check map is kept even when the report could not be written
        summary.health = Some(descriptor);
        outcome
    }

    fn run_fingerprint(&self, summary: &mut RunSummary) -> StageOutcome {
        let entry = &self.config.fingerprint.entry;

        match fingerprint(&self.artifact_dir, entry) {
            Ok(FingerprintOutcome::Computed(pair)) => {
                let entry_path = Path::new(entry);
                let names: Vec<String> = [DigestAlgorithm::Sha256, DigestAlgorithm::Sha1]
                    .iter()
                    .map(|a| sidecar_path(entry_path, *a).display().to_string())
                    .collect();
                let detail = format!("wrote {}", names.join(", "));
                summary.fingerprint = Some(pair);
                StageOutcome::Succeeded { detail }
            }
            Ok(FingerprintOutcome::Skipped { .. }) => StageOutcome::Skipped {
                reason: format!("{} not present", entry),
            },
            Err(e) => StageOutcome::Failed {
                error: e.to_string(),
            },
        }
    }
}
