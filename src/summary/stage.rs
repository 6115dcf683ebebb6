//! Per-stage outcomes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    Provenance,
    Health,
    Fingerprint,
}

impl StageKind {
    /// All stages in the order the pipeline runs them
    pub const ORDER: [StageKind; 3] = [
        StageKind::Provenance,
        StageKind::Health,
        StageKind::Fingerprint,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Provenance => "provenance",
            StageKind::Health => "health",
            StageKind::Fingerprint => "fingerprint",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to one stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StageOutcome {
    /// Stage completed; `detail` names what was written
    Succeeded { detail: String },
    /// Stage hit an I/O or serialization error
    Failed { error: String },
    /// Stage had nothing to do
    Skipped { reason: String },
}

impl StageOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, StageOutcome::Failed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, StageOutcome::Skipped { .. })
    }

    /// Console marker
    pub fn marker(&self) -> &'static str {
        match self {
            StageOutcome::Succeeded { .. } => "✓",
            StageOutcome::Failed { .. } => "✗",
            StageOutcome::Skipped { .. } => "-",
        }
    }

    fn message(&self) -> &str {
        match self {
            StageOutcome::Succeeded { detail } => detail,
            StageOutcome::Failed { error } => error,
            StageOutcome::Skipped { reason } => reason,
        }
    }
}

/// Outcome of one stage in a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: StageKind,
    #[serde(flatten)]
    pub outcome: StageOutcome,
}

impl StageReport {
    pub fn new(stage: StageKind, outcome: StageOutcome) -> Self {
        Self { stage, outcome }
    }

    /// One console line, e.g. `✓ provenance: wrote version.json`
    pub fn to_line(&self) -> String {
        format!("{} {}: {}", self.outcome.marker(), self.stage, self.outcome.message())
    }
}
