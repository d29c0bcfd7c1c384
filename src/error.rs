//! Error types for the sheet2deck client library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Sheet2DeckError`] — **Fatal**: the operation cannot proceed at all
//!   (bad configuration, unreadable session file, backend unreachable during
//!   login). Returned as `Err(Sheet2DeckError)` from library calls.
//!
//! * [`ConversionFailure`] — **Classified**: a single conversion submission
//!   ended badly (quota exhausted, session expired, file too large). It is a
//!   value, not a propagated error: the workflow records it, surfaces it once
//!   through the notification layer and returns to idle.
//!
//! File-intake rejections use the smaller [`RejectReason`], which converts
//! into a [`ConversionFailure`] when it needs to travel further.

use crate::pipeline::intake::FileClass;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the sheet2deck library.
#[derive(Debug, Error)]
pub enum Sheet2DeckError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// Local I/O failed on a known path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Caller-supplied value failed client-side validation.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ── Session errors ────────────────────────────────────────────────────
    /// No credential is stored; the caller must log in first.
    #[error("Not logged in.\nRun `sheet2deck login` first.")]
    NotAuthenticated,

    /// The durable session storage could not be read or written.
    #[error("Session storage error at '{path}': {detail}")]
    Storage { path: PathBuf, detail: String },

    // ── Backend errors ────────────────────────────────────────────────────
    /// The request never produced an HTTP response.
    #[error("Request to '{url}' failed: {reason}\nCheck your internet connection and the API base URL.")]
    Transport { url: String, reason: String },

    /// The backend answered with a non-2xx status.
    #[error("API error (HTTP {status}): {detail}")]
    Api { status: u16, detail: String },

    /// A response body did not have the expected shape.
    #[error("Unexpected response from '{url}': {detail}")]
    UnexpectedResponse { url: String, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Sheet2DeckError {
    /// HTTP status carried by an [`Sheet2DeckError::Api`] error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Sheet2DeckError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Why file intake refused a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum RejectReason {
    /// Extension is outside the csv-like and excel-like sets.
    #[error("Unsupported format '{extension}'. Provide a CSV, TSV, TXT, XLSX or XLS file.")]
    UnsupportedFormat { extension: String },

    /// File is larger than the ceiling for its class.
    #[error("File too large: {size} bytes (maximum {limit} bytes for {class} files)")]
    TooLarge {
        size: u64,
        limit: u64,
        class: FileClass,
    },
}

/// A classified, terminal outcome of one conversion submission.
///
/// Every variant maps to exactly one user-visible surface (inline text,
/// toast or modal); see [`crate::workflow`] for the policy.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ConversionFailure {
    /// No credential was stored; nothing was sent.
    #[error("You must be logged in to convert a file.")]
    NotAuthenticated,

    /// The backend rejected the credential (HTTP 401).
    #[error("Your session has expired. Please log in again.")]
    SessionExpired,

    /// The file has more rows than the plan allows.
    #[error("{message}")]
    RowLimitExceeded { message: String },

    /// The monthly conversion quota is used up.
    #[error("{message}")]
    QuotaExhausted {
        message: String,
        used: Option<u32>,
        limit: Option<u32>,
    },

    /// The file exceeds a size ceiling (client- or server-side).
    #[error("{message}")]
    TooLarge { message: String },

    /// The file extension is not accepted.
    #[error("Unsupported format '{extension}'.")]
    UnsupportedFormat { extension: String },

    /// Any other non-2xx answer.
    #[error("Server error (HTTP {status}): {message}")]
    ServerError { status: u16, message: String },

    /// No response at all (network failure, unreadable local file).
    #[error("Conversion failed: {message}")]
    Unknown { message: String },
}

impl ConversionFailure {
    /// Stable kebab-case code for logs and JSON output.
    pub fn code(&self) -> &'static str {
        match self {
            ConversionFailure::NotAuthenticated => "not-authenticated",
            ConversionFailure::SessionExpired => "session-expired",
            ConversionFailure::RowLimitExceeded { .. } => "row-limit-exceeded",
            ConversionFailure::QuotaExhausted { .. } => "quota-exhausted",
            ConversionFailure::TooLarge { .. } => "too-large",
            ConversionFailure::UnsupportedFormat { .. } => "unsupported-format",
            ConversionFailure::ServerError { .. } => "server-error",
            ConversionFailure::Unknown { .. } => "unknown",
        }
    }
}

impl From<RejectReason> for ConversionFailure {
    fn from(reason: RejectReason) -> Self {
        match reason {
            RejectReason::UnsupportedFormat { extension } => {
                ConversionFailure::UnsupportedFormat { extension }
            }
            too_large @ RejectReason::TooLarge { .. } => ConversionFailure::TooLarge {
                message: too_large.to_string(),
            },
        }
    }
}
