//! Error types for the papershift library.
//!
//! Two error types reflect two failure modes:
//!
//! * [`PaperShiftError`] — **Fatal**: the run cannot continue (missing
//!   input file, no API key, unreadable PDF, output not writable). Every
//!   variant maps to exit status 1 in the binaries.
//!
//! * [`PageError`] — **Non-fatal**: one page failed inside
//!   [`crate::convert::VisionConverter`] while the rest of the document is
//!   fine. Stored in [`crate::output::PageResult`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the papershift library.
#[derive(Debug, Error)]
pub enum PaperShiftError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{}'", path.display())]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{}' (first bytes: {magic:?})", path.display())]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── Credential errors ─────────────────────────────────────────────────
    /// Neither `--api-key` nor `OPENROUTER_API_KEY` supplied a credential.
    #[error(
        "API key is required. Provide it with --api-key or set OPENROUTER_API_KEY environment variable."
    )]
    MissingApiKey,

    // ── PDF errors ────────────────────────────────────────────────────────
    /// pdfium could not open the document.
    #[error("PDF '{}' could not be opened: {detail}", path.display())]
    CorruptPdf { path: PathBuf, detail: String },

    /// pdfium returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Install libpdfium or point --pdfium-lib / PDFIUM_LIB_PATH at an existing copy."
    )]
    PdfiumBindingFailed(String),

    /// The document has no pages to convert.
    #[error("PDF '{}' has no pages", path.display())]
    EmptyDocument { path: PathBuf },

    // ── Model errors ──────────────────────────────────────────────────────
    /// The model API returned a non-retryable error.
    #[error("LLM API error: {message}")]
    LlmApiError { message: String },

    /// The model API returned HTTP 429.
    #[error("Rate limit exceeded for model '{model}'")]
    RateLimitExceeded {
        model: String,
        retry_after_secs: Option<u64>,
    },

    /// The model refused the request in a way a retry cannot fix
    /// (unknown model, malformed request, unsupported input).
    #[error("Model rejected the request: {message}")]
    ModelRejected { message: String },

    /// The model API rejected the credential (401/403).
    #[error("Authentication error from OpenRouter: {detail}")]
    AuthError { detail: String },

    /// Every page failed after all retries; output would be empty.
    #[error("All {total} pages failed after {retries} retries each. First error: {first_error}")]
    AllPagesFailed {
        total: usize,
        retries: u32,
        first_error: String,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output Markdown file.
    #[error("Failed to write output file '{}': {source}", path.display())]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PaperShiftError {
    /// Whether retrying the same model call could succeed.
    ///
    /// Credential and request-shape problems are permanent; throttling and
    /// server-side failures are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaperShiftError::RateLimitExceeded { .. }
                | PaperShiftError::LlmApiError { .. }
                | PaperShiftError::Internal(_)
        )
    }
}

/// A non-fatal error for a single page.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// Page image encoding failed.
    #[error("Page {page}: image encoding failed: {detail}")]
    EncodeFailed { page: usize, detail: String },

    /// Model call failed after retries.
    #[error("Page {page}: LLM call failed after {retries} retries: {detail}")]
    LlmFailed {
        page: usize,
        retries: u32,
        detail: String,
    },
}
