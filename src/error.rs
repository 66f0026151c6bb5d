//! Error types for the edgequake-pdfqa library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`PdfQaError`] — **Fatal for the request**: nothing useful can be
//!   returned (unreadable document, missing question, bad input file).
//!   Returned as `Err(PdfQaError)` from the [`crate::engine::DocumentEngine`]
//!   entry points.
//!
//! * [`GenerationError`] — **Per-feature**: the text-generation service
//!   failed for one summary or one answer. It never aborts a request; the
//!   engine turns it into a visibly marked result so callers still receive
//!   page/word counts and every other field that was already computed.
//!
//! Both map onto a serialisable [`ErrorReport`] (`kind` + `message`) for
//! whatever boundary sits in front of the library.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Prefix carried by every generation-failure result shown to callers.
pub const GENERATION_ERROR_MARKER: &str = "[Generation Error]";

/// All request-level errors returned by the edgequake-pdfqa library.
#[derive(Debug, Error)]
pub enum PdfQaError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── Document errors ───────────────────────────────────────────────────
    /// Extraction produced no text at all (scanned images, empty file).
    #[error("The document is empty or unreadable: no text could be extracted")]
    UnreadableDocument,

    /// The extraction collaborator failed and no fallback mode recovered.
    #[error("Text extraction failed{}: {detail}", page.map(|p| format!(" on page {p}")).unwrap_or_default())]
    ExtractionFailure { page: Option<usize>, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or place the library next to the binary."
    )]
    PdfiumBindingFailed(String),

    // ── Question errors ───────────────────────────────────────────────────
    /// Q&A requested with neither a known document id nor inline context.
    #[error("No context available: unknown document id and no inline context supplied")]
    NoContext,

    /// Q&A requested with an empty question.
    #[error("A question is required")]
    MissingQuestion,

    // ── Config errors ─────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A failed call to the text-generation service.
///
/// `RateLimited` is the only retryable variant: the engine tries the
/// fallback model once and stops on anything else.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
pub enum GenerationError {
    /// Upstream answered 429 / "rate limit".
    #[error("model '{model}' is rate-limited: {detail}")]
    RateLimited { model: String, detail: String },

    /// The call did not complete within the configured timeout.
    #[error("model '{model}' timed out after {secs}s")]
    Timeout { model: String, secs: u64 },

    /// The call succeeded but produced no text.
    #[error("model '{model}' returned an empty response")]
    EmptyResponse { model: String },

    /// Any other provider failure.
    #[error("model '{model}' failed: {detail}")]
    Failed { model: String, detail: String },
}

impl GenerationError {
    /// Whether the failure is eligible for a retry against the fallback model.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GenerationError::RateLimited { .. })
    }

    /// Render the visibly marked string handed to callers in place of
    /// generated text.
    pub fn marker(&self) -> String {
        format!("{GENERATION_ERROR_MARKER} {self}")
    }
}

/// Coarse error category exposed at the library boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnreadableDocument,
    ExtractionFailure,
    GenerationFailure,
    NoContext,
    MissingQuestion,
    InvalidInput,
    Configuration,
    Internal,
}

impl PdfQaError {
    /// Classify the error for boundary reporting.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PdfQaError::FileNotFound { .. }
            | PdfQaError::PermissionDenied { .. }
            | PdfQaError::InvalidInput { .. }
            | PdfQaError::DownloadFailed { .. }
            | PdfQaError::DownloadTimeout { .. }
            | PdfQaError::NotAPdf { .. } => ErrorKind::InvalidInput,
            PdfQaError::UnreadableDocument => ErrorKind::UnreadableDocument,
            PdfQaError::ExtractionFailure { .. } => ErrorKind::ExtractionFailure,
            PdfQaError::NoContext => ErrorKind::NoContext,
            PdfQaError::MissingQuestion => ErrorKind::MissingQuestion,
            PdfQaError::PdfiumBindingFailed(_)
            | PdfQaError::ProviderNotConfigured { .. }
            | PdfQaError::InvalidConfig(_) => ErrorKind::Configuration,
            PdfQaError::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// Tagged error result (`kind` + `message`) for callers that serialise
/// failures instead of matching on Rust types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&PdfQaError> for ErrorReport {
    fn from(err: &PdfQaError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<&GenerationError> for ErrorReport {
    fn from(err: &GenerationError) -> Self {
        Self {
            kind: ErrorKind::GenerationFailure,
            message: err.to_string(),
        }
    }
}
