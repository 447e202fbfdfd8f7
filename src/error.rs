//! Error types for the inventory-pdf library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`GenerateError`] — **Fatal**: the document cannot be produced at all
//!   (CSV not decodable, output not writable, PDF serialisation failed).
//!   Returned as `Err(GenerateError)` from the top-level `generate*`
//!   functions. No artifact is left behind.
//!
//! * [`ImageWarning`] — **Non-fatal**: one record's photo could not be
//!   resolved (unreachable host, unsupported format, malformed reference).
//!   The resolver substitutes a placeholder and the run continues; the
//!   warning is stored in the result so callers can report it.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the inventory-pdf library.
///
/// Per-image failures use [`ImageWarning`] and are collected in the
/// generation result rather than propagated here.
#[derive(Debug, Error)]
pub enum GenerateError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The uploaded bytes could not be decoded as CSV.
    #[error("CSV could not be parsed{}: {detail}", line_suffix(.line))]
    CsvParse { line: Option<u64>, detail: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write the output PDF file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Serialising the page model to PDF failed.
    #[error("PDF rendering failed: {detail}")]
    RenderFailed { detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn line_suffix(line: &Option<u64>) -> String {
    line.map(|l| format!(" (line {l})")).unwrap_or_default()
}

impl From<csv::Error> for GenerateError {
    fn from(e: csv::Error) -> Self {
        let line = e.position().map(|p| p.line());
        GenerateError::CsvParse {
            line,
            detail: e.to_string(),
        }
    }
}

/// A non-fatal error for a single record's photo.
///
/// `record` is the 1-indexed position of the record in the CSV (header
/// excluded).
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum ImageWarning {
    /// The photo field holds no usable http(s) URL.
    #[error("Record {record}: no usable image URL in '{value}'")]
    MissingUrl { record: usize, value: String },

    /// The request failed before a response arrived.
    #[error("Record {record}: fetching '{url}' failed after {attempts} attempt(s): {detail}")]
    FetchFailed {
        record: usize,
        url: String,
        attempts: u32,
        detail: String,
    },

    /// The request did not complete within the configured timeout.
    #[error("Record {record}: fetching '{url}' timed out after {secs}s")]
    Timeout { record: usize, url: String, secs: u64 },

    /// The server answered with a non-2xx status.
    #[error("Record {record}: '{url}' returned HTTP {status}")]
    HttpStatus {
        record: usize,
        url: String,
        status: u16,
    },

    /// The declared content type is not JPEG, PNG or WebP.
    #[error("Record {record}: unsupported image type {content_type:?} at '{url}'")]
    UnsupportedType {
        record: usize,
        url: String,
        content_type: Option<String>,
    },

    /// The body could not be decoded (or transcoded) as the declared type.
    #[error("Record {record}: image at '{url}' could not be decoded: {detail}")]
    DecodeFailed {
        record: usize,
        url: String,
        detail: String,
    },
}

impl ImageWarning {
    /// 1-indexed record number the warning belongs to.
    pub fn record(&self) -> usize {
        match self {
            ImageWarning::MissingUrl { record, .. }
            | ImageWarning::FetchFailed { record, .. }
            | ImageWarning::Timeout { record, .. }
            | ImageWarning::HttpStatus { record, .. }
            | ImageWarning::UnsupportedType { record, .. }
            | ImageWarning::DecodeFailed { record, .. } => *record,
        }
    }
}
