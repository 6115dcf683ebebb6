//! Health report sidecar (health.txt)
//!
//! A three-line liveness report. Only the coarse fields are persisted; the
//! per-check map stays in memory and in the run summary.
//!
//! ```text
//! Status: healthy
//! Timestamp: 2026-10-19T08:00:00Z
//! Build: OK
//! ```

use chrono::{DateTime, Utc};
use std::fs;
use std::io;
use std::path::Path;

use super::{HealthDescriptor, HealthStatus};

/// Constant build marker line
pub const BUILD_MARKER: &str = "Build: OK";

/// Parsed or to-be-written health report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
}

impl HealthReport {
    /// Coarse view of a descriptor
    pub fn from_descriptor(descriptor: &HealthDescriptor) -> Self {
        Self {
            status: descriptor.status,
            timestamp: descriptor.timestamp,
        }
    }

    /// Render the fixed three-line format (trailing newline included)
    pub fn to_text(&self) -> String {
        format!(
            "Status: {}\nTimestamp: {}\n{}\n",
            self.status,
            self.timestamp.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            BUILD_MARKER
        )
    }

    /// Parse the fixed three-line format
    pub fn parse(text: &str) -> Result<Self, String> {
        let mut lines = text.lines().map(str::trim_end);

        let status = lines
            .next()
            .and_then(|l| l.strip_prefix("Status: "))
            .ok_or_else(|| "missing 'Status:' line".to_string())?
            .parse::<HealthStatus>()?;

        let timestamp_raw = lines
            .next()
            .and_then(|l| l.strip_prefix("Timestamp: "))
            .ok_or_else(|| "missing 'Timestamp:' line".to_string())?;
        let timestamp = DateTime::parse_from_rfc3339(timestamp_raw)
            .map_err(|e| format!("invalid timestamp '{}': {}", timestamp_raw, e))?
            .with_timezone(&Utc);

        match lines.next() {
            Some(BUILD_MARKER) => {}
            other => {
                return Err(format!(
                    "expected '{}', found {:?}",
                    BUILD_MARKER,
                    other.unwrap_or("end of file")
                ))
            }
        }

        if lines.any(|l| !l.is_empty()) {
            return Err("unexpected content after build marker".to_string());
        }

        Ok(Self { status, timestamp })
    }

    /// Write to file
    pub fn write_to_file(&self, path: &Path) -> io::Result<()> {
        fs::write(path, self.to_text())
    }

    /// Load from file
    pub fn from_file(path: &Path) -> io::Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn report(status: HealthStatus) -> HealthReport {
        HealthReport {
            status,
            timestamp: Utc.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_to_text() {
        assert_eq!(
            report(HealthStatus::Healthy).to_text(),
            "Status: healthy\nTimestamp: 2026-10-19T08:00:00.000Z\nBuild: OK\n"
        );
        assert!(report(HealthStatus::Degraded)
            .to_text()
            .starts_with("Status: degraded\n"));
    }

    #[test]
    fn test_parse_written_text() {
        let original = report(HealthStatus::Degraded);
        assert_eq!(HealthReport::parse(&original.to_text()).unwrap(), original);
    }

    #[test]
    fn test_parse_tolerates_crlf() {
        let text = "Status: healthy\r\nTimestamp: 2026-10-19T08:00:00Z\r\nBuild: OK\r\n";
        assert_eq!(HealthReport::parse(text).unwrap(), report(HealthStatus::Healthy));
    }

    #[test]
    fn test_parse_errors() {
        assert!(HealthReport::parse("").unwrap_err().contains("Status"));
        assert!(HealthReport::parse("Status: broken\n").is_err());
        assert!(HealthReport::parse("Status: healthy\nTimestamp: yesterday\nBuild: OK\n")
            .unwrap_err()
            .contains("invalid timestamp"));
        assert!(HealthReport::parse("Status: healthy\nTimestamp: 2026-10-19T08:00:00Z\n")
            .unwrap_err()
            .contains(BUILD_MARKER));
        assert!(HealthReport::parse(
            "Status: healthy\nTimestamp: 2026-10-19T08:00:00Z\nBuild: OK\nExtra: 1\n"
        )
        .is_err());
    }
}
