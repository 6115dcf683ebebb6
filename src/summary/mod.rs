//! Run summary, per-stage outcomes and exit codes

mod exit;
mod run_summary;
mod stage;

pub use exit::ExitCode;
pub use run_summary::RunSummary;
pub use stage::{StageKind, StageOutcome, StageReport};
