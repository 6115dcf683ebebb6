//! Integrity fingerprinter
//!
//! Hashes the build's entry file and writes two sidecars next to it:
//!
//! - `<entry>.sha256`: authoritative digest for any integrity check.
//! - `<entry>.sha1`: **deprecated**. Kept only for legacy verification
//!   tooling; SHA-1 is not collision resistant and must not back a new trust
//!   decision.
//!
//! Each sidecar holds exactly one lowercase hex digest with no trailing
//! newline. Both digests come from a single read of the entry file.
//!
//! Sidecars are staged as `<sidecar>.tmp` and renamed into place, so a failed
//! run never leaves a digest of the new content next to a digest of the old.

mod verify;

pub use verify::{verify_fingerprints, DigestCheck, VerificationResult};

use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Sidecars in write order
const ALGORITHMS: [DigestAlgorithm; 2] = [DigestAlgorithm::Sha256, DigestAlgorithm::Sha1];

/// Digest algorithms written as sidecars
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Sha256,
    /// Legacy compatibility only
    Sha1,
}

impl DigestAlgorithm {
    /// Sidecar file extension
    pub fn extension(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha256 => "sha256",
            DigestAlgorithm::Sha1 => "sha1",
        }
    }
}

/// SHA-256 and SHA-1 of the same bytes, hex-encoded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintPair {
    pub sha256: String,
    /// Deprecated, see module docs
    pub sha1: String,
}

impl FingerprintPair {
    /// Hash a byte buffer
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self {
            sha256: hex::encode(Sha256::digest(bytes)),
            sha1: hex::encode(Sha1::digest(bytes)),
        }
    }

    /// Digest for an algorithm
    pub fn get(&self, algorithm: DigestAlgorithm) -> &str {
        match algorithm {
            DigestAlgorithm::Sha256 => &self.sha256,
            DigestAlgorithm::Sha1 => &self.sha1,
        }
    }

    /// Load both sidecars written for `entry`
    pub fn from_sidecars(artifact_dir: &Path, entry: &str) -> io::Result<Self> {
        let entry_path = artifact_dir.join(entry);
        let read = |algorithm: DigestAlgorithm| -> io::Result<String> {
            let raw = fs::read_to_string(sidecar_path(&entry_path, algorithm))?;
            Ok(raw.trim().to_ascii_lowercase())
        };
        Ok(Self {
            sha256: read(DigestAlgorithm::Sha256)?,
            sha1: read(DigestAlgorithm::Sha1)?,
        })
    }
}

/// Result of the fingerprint stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FingerprintOutcome {
    /// Digests computed and both sidecars written
    Computed(FingerprintPair),
    /// Entry file absent; nothing written
    Skipped { path: PathBuf },
}

/// Errors from the fingerprinter
#[derive(Debug, thiserror::Error)]
pub enum FingerprintError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// `<entry>.<ext>` next to the entry file
pub fn sidecar_path(entry_path: &Path, algorithm: DigestAlgorithm) -> PathBuf {
    let mut name = OsString::from(entry_path.as_os_str());
    name.push(".");
    name.push(algorithm.extension());
    PathBuf::from(name)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

/// Stage both digests, then rename them into place (write-then-rename).
///
/// A staging failure leaves the previous pair untouched. A rename failure
/// after the first sidecar was replaced removes the remaining old sidecars,
/// since they no longer describe the entry file.
fn write_sidecars(entry_path: &Path, pair: &FingerprintPair) -> Result<(), FingerprintError> {
    let targets = ALGORITHMS.map(|algorithm| sidecar_path(entry_path, algorithm));
    let temps = targets.clone().map(|target| temp_path(&target));

    let discard_temps = || {
        for temp in &temps {
            let _ = fs::remove_file(temp);
        }
    };

    for ((algorithm, target), temp) in ALGORITHMS.iter().zip(&targets).zip(&temps) {
        if let Err(source) = fs::write(temp, pair.get(*algorithm)) {
            discard_temps();
            return Err(FingerprintError::Write {
                path: target.clone(),
                source,
            });
        }
    }

    for (i, (target, temp)) in targets.iter().zip(&temps).enumerate() {
        if let Err(source) = fs::rename(temp, target) {
            discard_temps();
            if i > 0 {
                for stale in &targets[i..] {
                    if fs::remove_file(stale).is_ok() {
                        warn!(path = %stale.display(), "removed stale digest sidecar");
                    }
                }
            }
            return Err(FingerprintError::Write {
                path: target.clone(),
                source,
            });
        }
        debug!(path = %target.display(), "wrote digest sidecar");
    }

    Ok(())
}

/// Read an entry file, treating "not found" as absent
pub(crate) fn read_entry(entry_path: &Path) -> Result<Option<Vec<u8>>, FingerprintError> {
    match fs::read(entry_path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(FingerprintError::Read {
            path: entry_path.to_path_buf(),
            source,
        }),
    }
}

/// Fingerprint `entry` inside `artifact_dir`.
///
/// An absent entry file yields [`FingerprintOutcome::Skipped`] and writes
/// nothing. Existing sidecars are overwritten.
pub fn fingerprint(
    artifact_dir: &Path,
    entry: &str,
) -> Result<FingerprintOutcome, FingerprintError> {
    let entry_path = artifact_dir.join(entry);

    let bytes = match read_entry(&entry_path)? {
        Some(bytes) => bytes,
        None => {
            info!(path = %entry_path.display(), "entry file absent, fingerprint skipped");
            return Ok(FingerprintOutcome::Skipped { path: entry_path });
        }
    };

    let pair = FingerprintPair::of_bytes(&bytes);
    write_sidecars(&entry_path, &pair)?;

    info!(
        entry = %entry_path.display(),
        bytes = bytes.len(),
        sha256 = %pair.sha256,
        "entry file fingerprinted"
    );

    Ok(FingerprintOutcome::Computed(pair))
}
