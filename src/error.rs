//! Error types for the paperfig library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`PaperfigError`]: **Fatal**: the document cannot be considered
//!   processed (bad input file, wrong password, an image or the caption map
//!   could not be written). Returned as `Err(PaperfigError)` from the
//!   top-level `extract*` functions.
//!
//! * [`SkipReason`]: **Non-fatal**: a single embedded image reference on a
//!   page has no usable bounding box. The reference is skipped and the rest
//!   of the page is processed normally. Skips are counted in
//!   [`crate::output::PageSummary`] so callers can see what was dropped.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the paperfig library.
///
/// Per-image lookup failures use [`SkipReason`] and never surface here.
#[derive(Debug, Error)]
pub enum PaperfigError {
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
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// The page selection matched no page of the document.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// A page could not be loaded from the document.
    #[error("Failed to load page {page}: {detail}")]
    PageLoadFailed { page: usize, detail: String },

    /// The page's text layer could not be read.
    #[error("Text extraction failed on page {page}: {detail}")]
    TextExtractionFailed { page: usize, detail: String },

    /// pdfium could not render the page holding a figure.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// A rendered figure could not be encoded as PNG.
    #[error("Failed to encode '{filename}' as PNG: {detail}")]
    ImageEncodeFailed { filename: String, detail: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write an image file or the caption map.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A caption map (or a correction response) is not a JSON object of
    /// filename → caption strings.
    #[error("Caption map is not valid JSON: {detail}")]
    MapParseFailed { detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A custom caption pattern did not compile.
    #[error("Invalid caption pattern '{pattern}': {detail}")]
    InvalidCaptionPattern { pattern: String, detail: String },

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium, place the library next to the\n\
working directory, or install it system-wide.\n\
Pre-built libraries: https://github.com/bblanchon/pdfium-binaries/releases\n"
    )]
    PdfiumBindingFailed(String),

    // ── Cancellation ──────────────────────────────────────────────────────
    /// The consumer of a figure stream went away before the run finished.
    /// Figures saved so far stay on disk; the caption map is not written.
    #[error("Extraction cancelled: the figure stream was dropped")]
    Cancelled,

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Why a single embedded image reference was skipped.
///
/// Returned as the `Err` side of [`crate::pipeline::source::BoxLookup`].
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum SkipReason {
    /// The backend could not report a bounding box for the image
    /// (malformed or unsupported image descriptor).
    #[error("image #{index}: bounding box unavailable: {detail}")]
    BoundsUnavailable { index: usize, detail: String },

    /// The reported bounding box has NaN or infinite coordinates.
    #[error("image #{index}: bounding box has non-finite coordinates")]
    NonFiniteBounds { index: usize },
}
