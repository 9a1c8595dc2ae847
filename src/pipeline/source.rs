//! The page-access seam between the extractor and a PDF backend.
//!
//! The extractor needs three capabilities from a page: the bounding boxes of
//! its embedded images, the text inside a rectangle, and a rendering of a
//! rectangle. [`FigurePage`] names exactly those. Production code uses the
//! pdfium backend in [`super::pdfium`]; tests drive the same pipeline with a
//! synthetic document built from plain rectangles and strings.

use crate::error::{PaperfigError, SkipReason};
use crate::geometry::{BoundingBox, CaptionSearchWindow, MergedRegion};
use crate::output::DocumentMetadata;
use image::DynamicImage;

/// Outcome of reading one embedded image's bounding box: a usable box, or
/// the reason the reference is skipped.
pub type BoxLookup = Result<BoundingBox, SkipReason>;

/// One page of a document, as seen by the extractor.
///
/// All rectangles are in top-down page space (see [`crate::geometry`]).
pub trait FigurePage {
    /// 1-indexed page number, used in logs, errors and records.
    fn page_num(&self) -> usize;

    /// Bounding boxes of the page's embedded images, in document order.
    fn image_boxes(&self) -> Vec<BoxLookup>;

    /// All text whose glyphs fall inside `window`, as one string.
    fn text_in(&self, window: &CaptionSearchWindow) -> Result<String, PaperfigError>;

    /// Render exactly `region` of the page at `zoom` × magnification.
    fn render_region(&self, region: &MergedRegion, zoom: f64) -> Result<DynamicImage, PaperfigError>;

    /// The page's full text layer.
    fn full_text(&self) -> Result<String, PaperfigError>;
}

/// A paged document.
pub trait FigureDocument {
    type Page<'p>: FigurePage
    where
        Self: 'p;

    fn page_count(&self) -> usize;

    /// Load the page at 0-based `index`.
    fn page(&self, index: usize) -> Result<Self::Page<'_>, PaperfigError>;

    fn metadata(&self) -> DocumentMetadata {
        DocumentMetadata {
            page_count: self.page_count(),
            ..DocumentMetadata::default()
        }
    }
}
