//! # paperfig
//!
//! Extract composite figures and their captions from research-paper PDFs.
//!
//! Papers often embed one figure as several images placed side by side
//! (panels *a*, *b*, *c* …). This crate finds the embedded images on each
//! page, chains neighbouring ones into one figure, renders the merged area
//! to a PNG and looks for a `Figure N:` caption just below it. The result is
//! a folder of `image{N}.png` files plus an `image_captions.json` map from
//! filename to caption, ready for slide or narration generators.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input    resolve local file or download from URL
//!  ├─ 2. Collect  bounding boxes of embedded images (pdfium, spawn_blocking)
//!  ├─ 3. Group    chain same-row, nearby boxes into figures
//!  ├─ 4. Render   rasterise each merged region at `zoom` → image{N}.png
//!  ├─ 5. Caption  regex match in the text window below the region
//!  └─ 6. Map      filename → caption, written as pretty JSON
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use paperfig::{extract_figures, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExtractionConfig::default(); // writes into ./images
//!     let output = extract_figures("paper.pdf", &config).await?;
//!     println!("{}", output.map.to_json_pretty()?);
//!     eprintln!("{} figures, {} captioned",
//!         output.stats.figures,
//!         output.stats.captioned);
//!     Ok(())
//! }
//! ```
//!
//! ## Custom backends
//!
//! [`extract_document`] runs over anything implementing
//! [`FigureDocument`], so the grouping and captioning logic can be driven
//! by another PDF library or by synthetic pages in tests.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `paperfig` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! paperfig = { version = "0.1", default-features = false }
//! ```
//!
//! pdfium itself is loaded at runtime: set `PDFIUM_LIB_PATH`, drop the
//! library in the working directory, or install it system-wide.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod correction;
pub mod error;
pub mod extract;
pub mod geometry;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder, PageSelection};
pub use correction::{
    apply_corrections, complete_from_full_captions, parse_caption_map, parse_full_captions,
    CorrectionRequest, FullCaption,
};
pub use error::{PaperfigError, SkipReason};
pub use extract::{
    document_text, extract_document, extract_figures, extract_figures_sync, extract_from_bytes,
    extract_text, inspect,
};
pub use geometry::{BoundingBox, CaptionSearchWindow, MergedRegion, PixelRect};
pub use output::{
    DocumentMetadata, DocumentText, ExtractionOutput, ExtractionStats, FigureCaption,
    ImageCaptionMap, ImageRecord, PageSummary, NO_CAPTION,
};
pub use pipeline::caption::{CaptionMatcher, RegexCaptionMatcher};
pub use pipeline::group::{group_boxes, GroupingTolerances, ImageGroup};
pub use pipeline::source::{BoxLookup, FigureDocument, FigurePage};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use stream::{extract_stream, FigureStream};
