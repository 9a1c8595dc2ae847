//! Progress-callback trait for per-page extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events as the extractor walks the document.
//!
//! Pages are processed strictly one after another, so events arrive in
//! document order: `on_page_start` for page N, then any skips and saved
//! figures of page N, then `on_page_complete` for page N.
//!
//! # Example
//!
//! ```rust
//! use paperfig::{ExtractionConfig, ExtractionProgressCallback, ImageRecord};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct FigureCounter {
//!     saved: AtomicUsize,
//! }
//!
//! impl ExtractionProgressCallback for FigureCounter {
//!     fn on_figure_saved(&self, page_num: usize, record: &ImageRecord) {
//!         self.saved.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("page {page_num}: {}", record.filename);
//!     }
//! }
//!
//! let counter = Arc::new(FigureCounter { saved: AtomicUsize::new(0) });
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ExtractionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::error::SkipReason;
use crate::output::ImageRecord;
use std::sync::Arc;

/// Called by the extractor as it processes each page.
///
/// Implementations must be `Send + Sync`: the async entry points run the
/// extractor on a blocking worker thread. All methods have default no-op
/// implementations so callers only override what they care about.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once before the first page is scanned.
    ///
    /// # Arguments
    /// * `total_pages`: number of selected pages that will be scanned
    fn on_extraction_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called before a page's image references are collected.
    ///
    /// # Arguments
    /// * `page_num`   : 1-indexed page number
    /// * `total_pages`: total selected pages
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when an image reference is skipped because its bounding box
    /// could not be read.
    fn on_image_skipped(&self, page_num: usize, reason: &SkipReason) {
        let _ = (page_num, reason);
    }

    /// Called after a figure's PNG is written and its caption recorded.
    fn on_figure_saved(&self, page_num: usize, record: &ImageRecord) {
        let _ = (page_num, record);
    }

    /// Called when every group of a page has been saved.
    ///
    /// # Arguments
    /// * `figures`: figures saved from this page
    fn on_page_complete(&self, page_num: usize, total_pages: usize, figures: usize) {
        let _ = (page_num, total_pages, figures);
    }

    /// Called once after the caption map has been written.
    ///
    /// # Arguments
    /// * `total_pages`: selected pages scanned
    /// * `figures`    : figures saved across the whole document
    fn on_extraction_complete(&self, total_pages: usize, figures: usize) {
        let _ = (total_pages, figures);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        pages: AtomicUsize,
        skips: AtomicUsize,
        figures: AtomicUsize,
    }

    impl ExtractionProgressCallback for TrackingCallback {
        fn on_page_start(&self, _page_num: usize, _total_pages: usize) {
            self.pages.fetch_add(1, Ordering::SeqCst);
        }

        fn on_image_skipped(&self, _page_num: usize, _reason: &SkipReason) {
            self.skips.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_complete(&self, _page_num: usize, _total_pages: usize, figures: usize) {
            self.figures.fetch_add(figures, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_extraction_start(2);
        cb.on_page_start(1, 2);
        cb.on_image_skipped(1, &SkipReason::NonFiniteBounds { index: 0 });
        cb.on_page_complete(1, 2, 0);
        cb.on_extraction_complete(2, 0);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_page_start(1, 2);
        tracker.on_image_skipped(1, &SkipReason::NonFiniteBounds { index: 2 });
        tracker.on_page_complete(1, 2, 3);
        tracker.on_page_start(2, 2);
        tracker.on_page_complete(2, 2, 1);

        assert_eq!(tracker.pages.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.skips.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.figures.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_extraction_start(10);
        cb.on_page_start(1, 10);
    }
}
