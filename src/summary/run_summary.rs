//! Run summary
//!
//! Collects every stage outcome of one pipeline run. Printed with `--json`;
//! never written into the artifact directory, whose sidecars stay the only
//! durable contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::exit::ExitCode;
use super::stage::{StageKind, StageOutcome, StageReport};
use crate::fingerprint::FingerprintPair;
use crate::health::HealthDescriptor;
use crate::provenance::VersionDescriptor;

/// Run summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Run identifier (UUID v4)
    pub run_id: String,

    /// Artifact directory the run targeted
    pub artifact_dir: String,

    /// When the run started
    pub started_at: DateTime<Utc>,

    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,

    /// One report per executed stage, in execution order
    pub stages: Vec<StageReport>,

    /// Version descriptor, when provenance succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<VersionDescriptor>,

    /// Full health descriptor including the check map
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<HealthDescriptor>,

    /// Digests, when the entry file was fingerprinted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<FingerprintPair>,

    /// Human-readable summary
    pub human_summary: String,
}

impl RunSummary {
    /// Start an empty summary
    pub fn new(run_id: String, artifact_dir: &Path, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id,
            artifact_dir: artifact_dir.to_string_lossy().to_string(),
            started_at,
            duration_ms: 0,
            stages: Vec::new(),
            version: None,
            health: None,
            fingerprint: None,
            human_summary: "No stages executed".to_string(),
        }
    }

    /// Append a stage report
    pub fn record(&mut self, stage: StageKind, outcome: StageOutcome) {
        self.stages.push(StageReport::new(stage, outcome));
        self.human_summary = self.generate_human_summary();
    }

    /// Set the final duration
    pub fn finish(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self.human_summary = self.generate_human_summary();
        self
    }

    /// Outcome of a stage, if it ran
    pub fn outcome(&self, stage: StageKind) -> Option<&StageOutcome> {
        self.stages
            .iter()
            .find(|r| r.stage == stage)
            .map(|r| &r.outcome)
    }

    pub fn stages_failed(&self) -> usize {
        self.stages.iter().filter(|r| r.outcome.is_failed()).count()
    }

    pub fn stages_skipped(&self) -> usize {
        self.stages.iter().filter(|r| r.outcome.is_skipped()).count()
    }

    pub fn stages_succeeded(&self) -> usize {
        self.stages.len() - self.stages_failed() - self.stages_skipped()
    }

    /// Whether every stage succeeded and the build is healthy
    pub fn is_clean(&self) -> bool {
        self.stages_failed() == 0
            && self.stages_skipped() == 0
            && self.health.as_ref().map_or(false, HealthDescriptor::is_healthy)
    }

    /// Exit code for a run that got past the directory precondition.
    ///
    /// Always `Success`: stage failures and degraded health are reported in
    /// the summary and the sidecars, not through the exit code.
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::Success
    }

    fn generate_human_summary(&self) -> String {
        let total = self.stages.len();
        let failed = self.stages_failed();
        let skipped = self.stages_skipped();
        let health = self
            .health
            .as_ref()
            .map(|h| h.status.as_str())
            .unwrap_or("unchecked");

        if failed == 0 && skipped == 0 {
            format!("Attestation complete: {}/{} stages succeeded, build {}", total, total, health)
        } else {
            format!(
                "Attestation partial: {} succeeded, {} failed, {} skipped, build {}",
                total - failed - skipped,
                failed,
                skipped,
                health
            )
        }
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::{check_health, RequiredEntry};
    use tempfile::TempDir;

    fn summary() -> RunSummary {
        RunSummary::new("run-123".to_string(), Path::new("/out"), Utc::now())
    }

    fn succeeded() -> StageOutcome {
        StageOutcome::Succeeded {
            detail: "ok".to_string(),
        }
    }

    #[test]
    fn test_empty_summary() {
        let run = summary();
        assert_eq!(run.stages.len(), 0);
        assert_eq!(run.human_summary, "No stages executed");
        assert_eq!(run.exit_code(), ExitCode::Success);
    }

    #[test]
    fn test_all_succeeded() {
        let mut run = summary();
        for stage in StageKind::ORDER {
            run.record(stage, succeeded());
        }

        assert_eq!(run.stages_succeeded(), 3);
        assert_eq!(run.stages_failed(), 0);
        assert_eq!(
            run.human_summary,
            "Attestation complete: 3/3 stages succeeded, build unchecked"
        );
    }

    #[test]
    fn test_failure_still_exits_success() {
        let mut run = summary();
        run.record(StageKind::Provenance, StageOutcome::Failed { error: "EACCES".to_string() });
        run.record(StageKind::Health, succeeded());
        run.record(StageKind::Fingerprint, StageOutcome::Skipped { reason: "absent".to_string() });

        assert_eq!(run.stages_failed(), 1);
        assert_eq!(run.stages_skipped(), 1);
        assert_eq!(run.stages_succeeded(), 1);
        assert!(!run.is_clean());
        assert_eq!(run.exit_code(), ExitCode::Success);
        assert!(run
            .human_summary
            .starts_with("Attestation partial: 1 succeeded, 1 failed, 1 skipped"));
    }

    #[test]
    fn test_is_clean_requires_healthy() {
        let dir = TempDir::new().unwrap();
        let mut run = summary();
        for stage in StageKind::ORDER {
            run.record(stage, succeeded());
        }
        run.health = Some(check_health(dir.path(), &RequiredEntry::defaults()));

        assert!(!run.is_clean());
    }

    #[test]
    fn test_outcome_lookup() {
        let mut run = summary();
        run.record(StageKind::Health, succeeded());

        assert_eq!(run.outcome(StageKind::Health), Some(&succeeded()));
        assert_eq!(run.outcome(StageKind::Fingerprint), None);
    }

    #[test]
    fn test_serialization() {
        let mut run = summary().finish(42);
        run.record(StageKind::Provenance, succeeded());

        let json = run.to_json().unwrap();
        assert!(json.contains(r#""run_id": "run-123""#));
        assert!(json.contains(r#""duration_ms": 42"#));
        assert!(json.contains(r#""status": "succeeded""#));
        assert!(!json.contains("\"health\""));

        let parsed = RunSummary::from_json(&json).unwrap();
        assert_eq!(parsed.stages, run.stages);
    }
}
