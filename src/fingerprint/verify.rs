//! Fingerprint verification
//!
//! Re-hashes the entry file and compares against the sidecars written at
//! build time. Any divergence means the file changed after the build.
//!
//! Passing requires the SHA-256 sidecar to match. The SHA-1 sidecar may be
//! absent (tooling that dropped the legacy digest), but if present it must
//! match too.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::{read_entry, sidecar_path, DigestAlgorithm, FingerprintError, FingerprintPair};

/// Comparison of one sidecar against the recomputed digest
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DigestCheck {
    Match,
    Mismatch { expected: String, actual: String },
    SidecarMissing,
}

/// Result of verifying one entry file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationResult {
    /// The entry file itself is gone
    EntryMissing { path: PathBuf },

    /// Digests recomputed and compared
    Checked {
        path: PathBuf,
        sha256: DigestCheck,
        sha1: DigestCheck,
    },
}

impl VerificationResult {
    /// Whether the entry file is intact
    pub fn passed(&self) -> bool {
        match self {
            VerificationResult::EntryMissing { .. } => false,
            VerificationResult::Checked { sha256, sha1, .. } => {
                *sha256 == DigestCheck::Match
                    && matches!(sha1, DigestCheck::Match | DigestCheck::SidecarMissing)
            }
        }
    }

    /// Human-readable summary
    pub fn summary(&self) -> String {
        match self {
            VerificationResult::EntryMissing { path } => {
                format!("Verification failed: {} is missing", path.display())
            }
            VerificationResult::Checked { path, sha256, sha1 } => {
                if self.passed() {
                    format!("Verification passed: {}", path.display())
                } else {
                    format!(
                        "Verification failed: {} (sha256: {}, sha1: {})",
                        path.display(),
                        sha256,
                        sha1
                    )
                }
            }
        }
    }
}

impl fmt::Display for DigestCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DigestCheck::Match => write!(f, "match"),
            DigestCheck::Mismatch { expected, actual } => write!(
                f,
                "mismatch ({}... vs {}...)",
                abbreviate(expected),
                abbreviate(actual)
            ),
            DigestCheck::SidecarMissing => write!(f, "sidecar missing"),
        }
    }
}

/// First 12 characters; sidecar text is arbitrary, so never slice by byte
fn abbreviate(digest: &str) -> String {
    digest.chars().take(12).collect()
}

fn compare(
    entry_path: &Path,
    algorithm: DigestAlgorithm,
    actual: &str,
) -> Result<DigestCheck, FingerprintError> {
    let path = sidecar_path(entry_path, algorithm);
    let expected = match fs::read(&path) {
        Ok(raw) => String::from_utf8_lossy(&raw).trim().to_ascii_lowercase(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(DigestCheck::SidecarMissing),
        Err(source) => return Err(FingerprintError::Read { path, source }),
    };

    if expected == actual {
        Ok(DigestCheck::Match)
    } else {
        Ok(DigestCheck::Mismatch {
            expected,
            actual: actual.to_string(),
        })
    }
}

/// Verify `entry` against its sidecars.
///
/// The entry file is read once; both digests are recomputed from that
/// buffer. Sidecar contents are compared after trimming whitespace and
/// lowercasing, so a trailing newline added by other tooling is tolerated.
pub fn verify_fingerprints(
    artifact_dir: &Path,
    entry: &str,
) -> Result<VerificationResult, FingerprintError> {
    let entry_path = artifact_dir.join(entry);

    let bytes = match read_entry(&entry_path)? {
        Some(bytes) => bytes,
        None => return Ok(VerificationResult::EntryMissing { path: entry_path }),
    };
    let actual = FingerprintPair::of_bytes(&bytes);

    let sha256 = compare(&entry_path, DigestAlgorithm::Sha256, &actual.sha256)?;
    let sha1 = compare(&entry_path, DigestAlgorithm::Sha1, &actual.sha1)?;

    Ok(VerificationResult::Checked {
        path: entry_path,
        sha256,
        sha1,
    })
}
