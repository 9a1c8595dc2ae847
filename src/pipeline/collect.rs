//! Bounding-box collection: split a page's image references into usable
//! boxes and skipped references.

use crate::error::SkipReason;
use crate::geometry::BoundingBox;
use crate::pipeline::source::{BoxLookup, FigurePage};
use tracing::{debug, warn};

/// Boxes read from one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectedBoxes {
    /// Usable boxes, in document order.
    pub boxes: Vec<BoundingBox>,
    /// References that were skipped, in document order.
    pub skipped: Vec<SkipReason>,
}

impl CollectedBoxes {
    /// Total image references seen on the page.
    pub fn image_refs(&self) -> usize {
        self.boxes.len() + self.skipped.len()
    }
}

/// Read every image reference on `page`.
///
/// A failed lookup never aborts the page: the reference lands in
/// [`CollectedBoxes::skipped`] and collection continues with the next one.
pub fn collect_boxes<P: FigurePage + ?Sized>(page: &P) -> CollectedBoxes {
    partition_lookups(page.page_num(), page.image_boxes())
}

pub(crate) fn partition_lookups(page_num: usize, lookups: Vec<BoxLookup>) -> CollectedBoxes {
    let mut collected = CollectedBoxes::default();
    for (index, lookup) in lookups.into_iter().enumerate() {
        match lookup {
            Ok(bbox) if bbox.is_finite() => collected.boxes.push(bbox),
            Ok(_) => {
                let reason = SkipReason::NonFiniteBounds { index };
                warn!("Page {}: skipping {}", page_num, reason);
                collected.skipped.push(reason);
            }
            Err(reason) => {
                warn!("Page {}: skipping {}", page_num, reason);
                collected.skipped.push(reason);
            }
        }
    }
    debug!(
        "Page {}: {} image boxes, {} skipped",
        page_num,
        collected.boxes.len(),
        collected.skipped.len()
    );
    collected
}
