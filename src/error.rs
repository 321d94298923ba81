//! Error types for the solarguard library.
//!
//! Every failure is a [`GuardError`]. The pipeline is fail-fast: the first
//! error at any stage aborts the run, and there is no partial-result path.
//!
//! Errors raised inside a stage are wrapped in [`GuardError::Stage`] by the
//! orchestrator so the message names the stage that failed. The underlying
//! cause stays reachable through [`GuardError::kind`] and
//! [`std::error::Error::source`], which lets a caller decide whether re-running
//! just that stage is worthwhile.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T, E = GuardError> = std::result::Result<T, E>;

/// All errors returned by the solarguard library.
#[derive(Debug, Error)]
pub enum GuardError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists but reading it failed part-way.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Upstream service errors ───────────────────────────────────────────
    /// The HTTP request could not complete (DNS, TLS, connection reset, …).
    #[error("Request to {service} failed: {detail}\nCheck your internet connection.")]
    Network { service: String, detail: String },

    /// The upstream call exceeded its configured timeout.
    #[error("{service} did not answer within {secs}s")]
    Timeout { service: String, secs: u64 },

    /// The service rejected the bearer credential (HTTP 401/403).
    #[error("Authentication rejected by {service} (HTTP {status}): {detail}\nCheck UPSTAGE_API_KEY.")]
    Auth {
        service: String,
        status: u16,
        detail: String,
    },

    /// The service answered with an error status or a payload we cannot read.
    #[error("{service} returned an unusable response: {detail}")]
    Model { service: String, detail: String },

    // ── Pipeline errors ───────────────────────────────────────────────────
    /// The model's extraction reply is not a bare non-negative integer.
    #[error("Could not read a debt figure from the model reply {reply:?}")]
    Extraction { reply: String },

    /// Caller-supplied input is out of range.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Missing or invalid configuration (e.g. no API key).
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The run was cancelled before it finished.
    #[error("Analysis cancelled")]
    Cancelled,

    /// A stage failed; `source` carries the cause.
    #[error("{stage} failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<GuardError>,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the report file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of a [`GuardError`], independent of stage wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum ErrorKind {
    Io,
    Network,
    Auth,
    Extraction,
    Model,
    Validation,
    Config,
    Cancelled,
    Internal,
}

/// The three pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Stage {
    /// PDF → text via the document-parsing service.
    Ingest,
    /// Text → summed claim ceiling via the chat model.
    Extract,
    /// Figures → narrative report via the chat model.
    Report,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Stage; 3] = [Stage::Ingest, Stage::Extract, Stage::Report];

    /// 1-based position in the pipeline.
    pub fn step(self) -> usize {
        match self {
            Stage::Ingest => 1,
            Stage::Extract => 2,
            Stage::Report => 3,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Ingest => "document ingest",
            Stage::Extract => "figure extraction",
            Stage::Report => "report generation",
        })
    }
}

impl GuardError {
    /// Wrap this error with the stage it occurred in.
    ///
    /// Already-wrapped errors and cancellation are returned unchanged.
    pub fn in_stage(self, stage: Stage) -> Self {
        match self {
            GuardError::Stage { .. } | GuardError::Cancelled => self,
            other => GuardError::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// The stage this error was raised in, if it came out of the pipeline.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            GuardError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Classify the error, looking through any stage wrapper.
    pub fn kind(&self) -> ErrorKind {
        match self {
            GuardError::FileNotFound { .. }
            | GuardError::PermissionDenied { .. }
            | GuardError::ReadFailed { .. }
            | GuardError::OutputWriteFailed { .. } => ErrorKind::Io,
            GuardError::Network { .. } | GuardError::Timeout { .. } => ErrorKind::Network,
            GuardError::Auth { .. } => ErrorKind::Auth,
            GuardError::Model { .. } => ErrorKind::Model,
            GuardError::Extraction { .. } => ErrorKind::Extraction,
            GuardError::Validation(_) => ErrorKind::Validation,
            GuardError::Config(_) => ErrorKind::Config,
            GuardError::Cancelled => ErrorKind::Cancelled,
            GuardError::Internal(_) => ErrorKind::Internal,
            GuardError::Stage { source, .. } => source.kind(),
        }
    }

    /// Whether re-running the failed stage could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Network | ErrorKind::Model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_wrapper_names_the_stage() {
        let e = GuardError::Extraction {
            reply: "약 2억5천만원".into(),
        }
        .in_stage(Stage::Extract);
        let msg = e.to_string();
        assert!(msg.starts_with("figure extraction failed"), "got: {msg}");
        assert!(msg.contains("약 2억5천만원"), "got: {msg}");
        assert_eq!(e.stage(), Some(Stage::Extract));
        assert_eq!(e.kind(), ErrorKind::Extraction);
    }

    #[test]
    fn wrapping_twice_keeps_the_first_stage() {
        let e = GuardError::Network {
            service: "document-parse".into(),
            detail: "connection reset".into(),
        }
        .in_stage(Stage::Ingest)
        .in_stage(Stage::Report);
        assert_eq!(e.stage(), Some(Stage::Ingest));
    }

    #[test]
    fn cancellation_is_not_wrapped() {
        let e = GuardError::Cancelled.in_stage(Stage::Report);
        assert!(matches!(e, GuardError::Cancelled));
        assert_eq!(e.stage(), None);
    }

    #[test]
    fn timeout_counts_as_network() {
        let e = GuardError::Timeout {
            service: "chat-completions".into(),
            secs: 60,
        };
        assert_eq!(e.kind(), ErrorKind::Network);
        assert!(e.is_retryable());
        assert!(e.to_string().contains("60s"));
    }

    #[test]
    fn auth_error_display() {
        let e = GuardError::Auth {
            service: "chat-completions".into(),
            status: 401,
            detail: "invalid key".into(),
        };
        assert!(e.to_string().contains("401"));
        assert!(e.to_string().contains("invalid key"));
        assert!(!e.is_retryable());
    }

    #[test]
    fn source_chain_reaches_the_cause() {
        use std::error::Error;
        let e = GuardError::Validation("market price must be greater than zero".into())
            .in_stage(Stage::Report);
        let cause = e.source().map(|s| s.to_string()).unwrap_or_default();
        assert!(cause.contains("market price"), "got: {cause}");
    }

    #[test]
    fn stage_steps_follow_execution_order() {
        let steps: Vec<usize> = Stage::ALL.iter().map(|s| s.step()).collect();
        assert_eq!(steps, vec![1, 2, 3]);
    }
}
