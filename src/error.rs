//! Error types for Vitalink

use thiserror::Error;

/// Frame-level parse failures.
///
/// Both variants are recoverable: the ingestion loop logs the error, drops
/// the frame, and moves on to the next line.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("frame is not a JSON object (must start with '{{' and end with '}}')")]
    NotAnObject,

    #[error("invalid frame encoding: {0}")]
    InvalidEncoding(#[from] serde_json::Error),
}

/// Per-key defects inside an otherwise valid frame.
///
/// Warnings never abort processing of the rest of the line; they are
/// surfaced alongside the decoded events and logged by the ingestion loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameWarning {
    /// A key outside the recognized enumeration
    UnknownKey(String),
    /// A recognized key whose value has the wrong shape
    MalformedField { key: String, reason: String },
}

impl std::fmt::Display for FrameWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameWarning::UnknownKey(key) => write!(f, "unknown key: {}", key),
            FrameWarning::MalformedField { key, reason } => {
                write!(f, "malformed field {}: {}", key, reason)
            }
        }
    }
}

/// Persistence collaborator failures
#[derive(Debug, Error)]
pub enum PersistError {
    /// A record for that date already exists. Recoverable: the snapshot is
    /// discarded for this attempt and the store is left intact.
    #[error("a daily record for {0} already exists")]
    DuplicateDate(chrono::NaiveDate),

    #[error("persistence backend failure: {0}")]
    Backend(String),
}

/// Emergency alert path failures
#[derive(Debug, Error)]
pub enum AlertError {
    /// No recipient has ever been registered; the dispatcher is not invoked
    #[error("no alert recipient registered")]
    NoRecipient,

    #[error("alert dispatch failed: {0}")]
    Dispatch(String),
}

/// Errors that escape the engine core.
///
/// TransportFatal is the only fatal condition: it terminates the ingestion
/// loop and is escalated to the supervising process. The query and
/// emergency surfaces remain servable from already-aggregated state.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("device transport closed or unreadable: {0}")]
    TransportFatal(String),
}
