//! Stable process exit codes

use serde::{Deserialize, Serialize};

/// Stable exit codes
///
/// A run whose artifact directory exists always exits with `Success`, even
/// when health is degraded or a stage failed; callers inspect the sidecars.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum ExitCode {
    /// Run completed (stage outcomes are in the summary)
    #[default]
    Success = 0,
    /// Artifact directory does not exist
    MissingArtifactDir = 10,
    /// `config` found a configuration value it could not use; `run` and
    /// `verify` fall back to defaults instead
    Config = 20,
    /// `verify` found a missing entry file or a digest mismatch
    VerificationFailed = 30,
}

impl ExitCode {
    /// Get the integer value of the exit code
    pub fn as_i32(&self) -> i32 {
        *self as i32
    }

    /// Check if this exit code indicates success
    pub fn is_success(&self) -> bool {
        matches!(self, ExitCode::Success)
    }
}
