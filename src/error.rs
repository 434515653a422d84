//! Error types for the timetable-extract library.
//!
//! Every failure is terminal for the request that hit it, so there is a single
//! fatal error type, [`ExtractError`]. Each variant maps onto exactly one
//! [`ErrorCode`], which is what callers (and the HTTP layer) see.
//!
//! Validation problems are collected rather than short-circuited: the
//! validator returns every [`FieldIssue`] it finds so a caller can fix a
//! document in one pass.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Stable, caller-facing error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    UnsupportedFileType,
    FileTooLarge,
    NoFileProvided,
    InvalidRequest,
    ValidationFailed,
    ImageProcessingFailed,
    PdfProcessingFailed,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::UnsupportedFileType => "UNSUPPORTED_FILE_TYPE",
            ErrorCode::FileTooLarge => "FILE_TOO_LARGE",
            ErrorCode::NoFileProvided => "NO_FILE_PROVIDED",
            ErrorCode::InvalidRequest => "INVALID_REQUEST",
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::ImageProcessingFailed => "IMAGE_PROCESSING_FAILED",
            ErrorCode::PdfProcessingFailed => "PDF_PROCESSING_FAILED",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A problem attached to one field of the model's output.
///
/// Used both for hard validation errors and for non-fatal warnings.
/// `path` locates the field, e.g. `timeblocks[2].end_time`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldIssue {
    pub path: String,
    pub message: String,
}

impl FieldIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// All fatal errors returned by the timetable-extract library.
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Request errors ────────────────────────────────────────────────────
    /// No `file` part in the upload.
    #[error("No file provided. Upload the timetable in a multipart field named 'file'.")]
    NoFileProvided,

    /// The request could not be read (malformed multipart etc.).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The upload exceeds the configured size limit.
    #[error("File is too large ({size} bytes); the maximum is {max} bytes")]
    FileTooLarge { size: usize, max: usize },

    /// The MIME type is not one the router accepts.
    #[error("Unsupported file type '{mime}'. Allowed types: {}", .allowed.join(", "))]
    UnsupportedFileType { mime: String, allowed: Vec<String> },

    // ── Input errors (CLI) ────────────────────────────────────────────────
    /// Local input file was not found.
    #[error("File not found: '{path}'")]
    FileNotFound { path: std::path::PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Image errors ──────────────────────────────────────────────────────
    /// The image could not be decoded, resized or re-encoded.
    #[error("Image processing failed: {0}")]
    ImageProcessing(String),

    /// The OCR engine could not run.
    #[error("OCR failed: {0}")]
    OcrFailed(String),

    /// OCR ran but its confidence is too low to trust the text.
    #[error(
        "Image quality too low for text recognition (OCR confidence {confidence:.1} < {threshold:.1}).\n\
Upload a sharper, well-lit scan of the timetable."
    )]
    LowOcrConfidence { confidence: f32, threshold: f32 },

    /// OCR produced too little text to be a timetable.
    #[error(
        "Could not read enough text from the image ({chars} chars, need at least {min}).\n\
Upload a clearer image of the timetable."
    )]
    InsufficientOcrText { chars: usize, min: usize },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// pdfium could not open or read the document.
    #[error("PDF processing failed: {0}")]
    PdfProcessing(String),

    /// The PDF carries (almost) no embedded text, most likely a scan.
    #[error(
        "PDF contains too little text ({chars} chars, need at least {min}); it is probably a scanned document.\n\
Please convert the page to an image (PNG or JPEG) and upload that instead."
    )]
    ScannedPdf { chars: usize, min: usize },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The LLM API call failed.
    #[error("LLM API error: {message}")]
    LlmApiError { message: String },

    /// The model replied, but not with a JSON object.
    #[error("Could not parse JSON from model response: {detail}")]
    ResponseParse { detail: String },

    // ── Validation ────────────────────────────────────────────────────────
    /// The model's JSON violates the schema or business rules.
    #[error("Extraction result failed validation ({} error(s)): {}", .errors.len(), summarize(.errors))]
    ValidationFailed { errors: Vec<FieldIssue> },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExtractError {
    /// The caller-facing code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            ExtractError::NoFileProvided => ErrorCode::NoFileProvided,
            ExtractError::InvalidRequest(_)
            | ExtractError::FileNotFound { .. }
            | ExtractError::DownloadFailed { .. }
            | ExtractError::DownloadTimeout { .. } => ErrorCode::InvalidRequest,
            ExtractError::FileTooLarge { .. } => ErrorCode::FileTooLarge,
            ExtractError::UnsupportedFileType { .. } => ErrorCode::UnsupportedFileType,
            ExtractError::ImageProcessing(_)
            | ExtractError::OcrFailed(_)
            | ExtractError::LowOcrConfidence { .. }
            | ExtractError::InsufficientOcrText { .. } => ErrorCode::ImageProcessingFailed,
            ExtractError::PdfProcessing(_) | ExtractError::ScannedPdf { .. } => {
                ErrorCode::PdfProcessingFailed
            }
            ExtractError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            ExtractError::ProviderNotConfigured { .. }
            | ExtractError::LlmApiError { .. }
            | ExtractError::ResponseParse { .. }
            | ExtractError::InvalidConfig(_)
            | ExtractError::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Structured details worth returning to the caller, if any.
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            ExtractError::ValidationFailed { errors } => serde_json::to_value(errors).ok(),
            ExtractError::UnsupportedFileType { allowed, .. } => {
                Some(serde_json::json!({ "allowedTypes": allowed }))
            }
            ExtractError::FileTooLarge { max, .. } => {
                Some(serde_json::json!({ "maxFileSize": max }))
            }
            ExtractError::LowOcrConfidence {
                confidence,
                threshold,
            } => Some(serde_json::json!({
                "ocrConfidence": confidence,
                "threshold": threshold,
            })),
            _ => None,
        }
    }
}

fn summarize(errors: &[FieldIssue]) -> String {
    match errors {
        [] => "no details".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{first} (and {} more)", rest.len()),
    }
}
