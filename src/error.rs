// Error taxonomy for authdiff
//
// Only pre-run failures are fatal. Anything that goes wrong while probing a
// single target surfaces as a Classification in the output table instead
// (CONNECTION_ERROR for transport faults) so the run always advances.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    /// Bad configuration detected before any probing starts.
    #[error("configuration error: {0}")]
    Config(String),

    /// The target list file could not be read or parsed. Fatal pre-run.
    #[error("failed to load target list {path}: {reason}")]
    TargetList { path: String, reason: String },

    /// I/O failure while persisting a report.
    #[error("failed to write report: {0}")]
    Report(#[from] std::io::Error),

    /// The introspection request itself failed. Unlike engine probes, an
    /// introspection run has exactly one target, so there is no next target
    /// to advance to.
    #[error("introspection request failed: {0}")]
    Introspection(#[from] reqwest::Error),
}
