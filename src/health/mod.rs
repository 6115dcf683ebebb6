//! Structural health checker
//!
//! Existence-based verification that the expected build outputs are present.
//! A missing path is data, not an error: it downgrades the status to
//! `degraded` and is recorded in the check map. Only writing the report can
//! fail.

mod report;

pub use report::{HealthReport, BUILD_MARKER};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::config::DEFAULT_REQUIRED_ENTRIES;

/// File name of the health report sidecar
pub const HEALTH_FILE: &str = "health.txt";

/// Checks that start out as `ok` on every run
pub const BASELINE_CHECKS: &[&str] = &["build", "assets", "manifest"];

/// Overall health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HealthStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "healthy" => Ok(HealthStatus::Healthy),
            "degraded" => Ok(HealthStatus::Degraded),
            other => Err(format!("unknown health status '{}'", other)),
        }
    }
}

/// Result of a single check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckResult {
    Ok,
    Missing,
}

/// An entry that must exist in the artifact directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredEntry {
    /// Key recorded in the check map
    pub check: String,

    /// Path relative to the artifact directory (file or directory)
    pub path: String,
}

impl RequiredEntry {
    pub fn new(check: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            check: check.into(),
            path: path.into(),
        }
    }

    /// index.html, manifest.webmanifest and assets/
    pub fn defaults() -> Vec<Self> {
        DEFAULT_REQUIRED_ENTRIES
            .iter()
            .map(|(check, path)| Self::new(*check, *path))
            .collect()
    }
}

/// In-memory health descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthDescriptor {
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    pub checks: BTreeMap<String, CheckResult>,
}

impl HealthDescriptor {
    /// Evaluate `required` against `artifact_dir`.
    ///
    /// Starts healthy with every baseline check `ok`. Each missing entry sets
    /// its check to `missing` and the status to `degraded`; nothing moves a
    /// check back from `missing` to `ok`.
    pub fn evaluate(
        artifact_dir: &Path,
        required: &[RequiredEntry],
        timestamp: DateTime<Utc>,
    ) -> Self {
        let mut status = HealthStatus::Healthy;
        let mut checks: BTreeMap<String, CheckResult> = BASELINE_CHECKS
            .iter()
            .map(|name| (name.to_string(), CheckResult::Ok))
            .collect();

        for entry in required {
            let path = artifact_dir.join(&entry.path);
            if entry_exists(&path) {
                checks.entry(entry.check.clone()).or_insert(CheckResult::Ok);
            } else {
                debug!(check = %entry.check, path = %path.display(), "required entry missing");
                checks.insert(entry.check.clone(), CheckResult::Missing);
                status = HealthStatus::Degraded;
            }
        }

        Self {
            status,
            timestamp,
            checks,
        }
    }

    /// Check names reporting `missing`, in sorted order
    pub fn missing(&self) -> Vec<&str> {
        self.checks
            .iter()
            .filter(|(_, result)| **result == CheckResult::Missing)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

/// Errors from the health checker
#[derive(Debug, thiserror::Error)]
pub enum HealthError {
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Unreadable paths count as missing
fn entry_exists(path: &Path) -> bool {
    match path.try_exists() {
        Ok(exists) => exists,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "existence check failed");
            false
        }
    }
}

/// Evaluate the required entries at the current time
pub fn check_health(artifact_dir: &Path, required: &[RequiredEntry]) -> HealthDescriptor {
    HealthDescriptor::evaluate(artifact_dir, required, Utc::now())
}

/// Persist the coarse health report to `health.txt`
pub fn write_health_report(
    artifact_dir: &Path,
    descriptor: &HealthDescriptor,
) -> Result<PathBuf, HealthError> {
    let path = artifact_dir.join(HEALTH_FILE);
    HealthReport::from_descriptor(descriptor)
        .write_to_file(&path)
        .map_err(|source| HealthError::Write {
            path: path.clone(),
            source,
        })?;
    Ok(path)
}

/// Outcome of a check-and-persist pass
#[derive(Debug)]
pub struct HealthRun {
    /// Check map and status, kept even when the report could not be written
    pub descriptor: HealthDescriptor,

    /// Path of the written report, or the write error
    pub written: Result<PathBuf, HealthError>,
}

/// Check and persist in one step
pub fn run_health_check(artifact_dir: &Path, required: &[RequiredEntry]) -> HealthRun {
    let descriptor = check_health(artifact_dir, required);

    if descriptor.is_healthy() {
        info!("build structure healthy");
    } else {
        warn!(missing = ?descriptor.missing(), "build structure degraded");
    }

    let written = write_health_report(artifact_dir, &descriptor);
    HealthRun {
        descriptor,
        written,
    }
}
