//! Error types for meetnotes.
//!
//! Library crates use [`MeetNotesError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Per-source ingestion problems are *not* errors at this level: the
//! normalizer records them in the source's status and the manifest. Only
//! request-level failures travel through [`Result`].

use std::path::PathBuf;

use crate::types::{Mode, Rejection};

/// Top-level error type for all meetnotes operations.
#[derive(Debug, thiserror::Error)]
pub enum MeetNotesError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while talking to a collaborator.
    #[error("network error: {0}")]
    Network(String),

    /// Response or document parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad request shape, empty input, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// HTML-to-Markdown conversion error.
    #[error("conversion error: {0}")]
    Conversion(String),

    /// A source adapter (fetcher, PDF extractor, transcriber) failed.
    ///
    /// The normalizer absorbs these into a `failed` record; they only
    /// surface directly when an adapter is called outside the pipeline.
    #[error("ingestion error: {0}")]
    Ingestion(String),

    /// Fewer qualifying sources than the synthesis mode requires.
    #[error("{}", insufficient_message(.mode, .required, .qualified, .rejected))]
    InsufficientSources {
        mode: Mode,
        required: usize,
        qualified: usize,
        rejected: Vec<Rejection>,
    },

    /// The text-completion call failed or timed out. No partial output exists.
    #[error("completion service unavailable: {reason}")]
    CompletionUnavailable { reason: String, retryable: bool },

    /// The request was cancelled before the completion call committed output.
    #[error("request cancelled before completion")]
    Cancelled,

    /// Speech-to-text or text-to-speech error.
    #[error("speech error: {0}")]
    Speech(String),

    /// Recording or playback command error.
    #[error("audio error: {0}")]
    Audio(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, MeetNotesError>;

impl MeetNotesError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// A completion failure that is worth retrying (timeouts, 5xx, transport).
    pub fn completion_retryable(reason: impl Into<String>) -> Self {
        Self::CompletionUnavailable {
            reason: reason.into(),
            retryable: true,
        }
    }

    /// A completion failure that will not go away on retry (bad key, 4xx).
    pub fn completion_fatal(reason: impl Into<String>) -> Self {
        Self::CompletionUnavailable {
            reason: reason.into(),
            retryable: false,
        }
    }

    /// Whether the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::CompletionUnavailable {
                retryable: true,
                ..
            }
        )
    }
}

fn insufficient_message(
    mode: &Mode,
    required: &usize,
    qualified: &usize,
    rejected: &[Rejection],
) -> String {
    let mut msg = match mode {
        Mode::Single => format!(
            "single mode requires exactly {required} readable source, found {qualified}"
        ),
        Mode::Weekly => format!(
            "weekly mode requires at least {required} readable sources, found {qualified}"
        ),
    };

    if !rejected.is_empty() {
        let reasons = rejected
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        msg.push_str(&format!(" (rejected: {reasons})"));
    }

    msg
}
