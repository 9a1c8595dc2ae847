//! Caption lookup below a merged figure region.
//!
//! The page's text layer is queried inside a [`CaptionSearchWindow`] hanging
//! under the figure, and a [`CaptionMatcher`] picks the caption out of that
//! text. The default matcher is a case-insensitive regex for
//! `Figure N: …` / `Fig. N: …`; the first match on a line wins.

use crate::error::PaperfigError;
use crate::geometry::{CaptionSearchWindow, MergedRegion};
use crate::output::FigureCaption;
use crate::pipeline::source::FigurePage;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Default caption pattern. `.` stops at line ends, so a caption runs to the
/// end of its first text line.
pub const DEFAULT_CAPTION_PATTERN: &str = r"(?i)(?:Figure|Fig\.)\s?\d+\s?:\s?.+";

static DEFAULT_CAPTION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(DEFAULT_CAPTION_PATTERN).unwrap());

/// Picks a caption out of the text found beneath a figure.
pub trait CaptionMatcher: Send + Sync {
    /// The caption in `text`, already trimmed, or `None`.
    fn find_caption(&self, text: &str) -> Option<String>;

    /// Short description for logs and `Debug` output.
    fn describe(&self) -> String;
}

/// Regex-backed [`CaptionMatcher`]: the first match, trimmed.
#[derive(Debug, Clone)]
pub struct RegexCaptionMatcher {
    re: Regex,
}

impl RegexCaptionMatcher {
    pub fn new(pattern: &str) -> Result<Self, PaperfigError> {
        let re = Regex::new(pattern).map_err(|e| PaperfigError::InvalidCaptionPattern {
            pattern: pattern.to_string(),
            detail: e.to_string(),
        })?;
        Ok(Self { re })
    }

    pub fn as_str(&self) -> &str {
        self.re.as_str()
    }
}

impl Default for RegexCaptionMatcher {
    fn default() -> Self {
        Self {
            re: DEFAULT_CAPTION_RE.clone(),
        }
    }
}

impl CaptionMatcher for RegexCaptionMatcher {
    fn find_caption(&self, text: &str) -> Option<String> {
        self.re
            .find(text)
            .map(|m| m.as_str().trim().to_string())
            .filter(|caption| !caption.is_empty())
    }

    fn describe(&self) -> String {
        format!("regex {:?}", self.re.as_str())
    }
}

/// Look for the caption of `region` on `page`.
///
/// A window with no matching text yields [`FigureCaption::NotFound`]; only a
/// failing text layer is an error.
pub fn locate_caption<P: FigurePage + ?Sized>(
    page: &P,
    region: &MergedRegion,
    margin: f64,
    depth: f64,
    matcher: &dyn CaptionMatcher,
) -> Result<FigureCaption, PaperfigError> {
    let window = CaptionSearchWindow::below(region, margin, depth);
    let text = page.text_in(&window)?;
    let caption = FigureCaption::from(matcher.find_caption(&text));

    debug!(
        "Page {}: caption window {:.0},{:.0}..{:.0},{:.0} -> {}",
        page.page_num(),
        window.left,
        window.top,
        window.right,
        window.bottom,
        caption
    );
    Ok(caption)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::NO_CAPTION;
    use crate::pipeline::source::BoxLookup;
    use image::DynamicImage;
    use std::cell::RefCell;

    #[test]
    fn matches_figure_and_fig_forms() {
        let m = RegexCaptionMatcher::default();
        assert_eq!(
            m.find_caption("Figure 1: A sample diagram.").as_deref(),
            Some("Figure 1: A sample diagram.")
        );
        assert_eq!(
            m.find_caption("see Fig. 12 : ablation").as_deref(),
            Some("Fig. 12 : ablation")
        );
        assert_eq!(m.find_caption("FIGURE 3:overview").as_deref(), Some("FIGURE 3:overview"));
    }

    #[test]
    fn first_match_wins_and_stops_at_line_end() {
        let m = RegexCaptionMatcher::default();
        let text = "Table 1: ignored\nFigure 2: First one.  \nFigure 3: Second one.";
        assert_eq!(m.find_caption(text).as_deref(), Some("Figure 2: First one."));
    }

    #[test]
    fn requires_number_and_colon() {
        let m = RegexCaptionMatcher::default();
        assert_eq!(m.find_caption("Figure shows the results"), None);
        assert_eq!(m.find_caption("Figure 4 shows the results"), None);
        assert_eq!(m.find_caption("Fig 4: no dot"), None);
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let err = RegexCaptionMatcher::new("(unclosed").unwrap_err();
        assert!(matches!(err, PaperfigError::InvalidCaptionPattern { .. }));
    }

    #[test]
    fn custom_pattern_replaces_default() {
        let m = RegexCaptionMatcher::new(r"Plate [IVX]+\..+").unwrap();
        assert_eq!(m.find_caption("Plate IV. Coastline").as_deref(), Some("Plate IV. Coastline"));
        assert_eq!(m.find_caption("Figure 1: nope"), None);
    }

    struct TextPage {
        text: String,
        seen: RefCell<Option<CaptionSearchWindow>>,
    }

    impl FigurePage for TextPage {
        fn page_num(&self) -> usize {
            1
        }

        fn image_boxes(&self) -> Vec<BoxLookup> {
            Vec::new()
        }

        fn text_in(&self, window: &CaptionSearchWindow) -> Result<String, PaperfigError> {
            *self.seen.borrow_mut() = Some(*window);
            Ok(self.text.clone())
        }

        fn render_region(&self, _: &MergedRegion, _: f64) -> Result<DynamicImage, PaperfigError> {
            Ok(DynamicImage::new_rgb8(1, 1))
        }

        fn full_text(&self) -> Result<String, PaperfigError> {
            Ok(self.text.clone())
        }
    }

    fn region() -> MergedRegion {
        MergedRegion {
            left: 100.0,
            top: 100.0,
            right: 200.0,
            bottom: 200.0,
        }
    }

    #[test]
    fn locate_queries_window_below_region() {
        let page = TextPage {
            text: "Figure 5: Below.".into(),
            seen: RefCell::new(None),
        };
        let caption =
            locate_caption(&page, &region(), 300.0, 400.0, &RegexCaptionMatcher::default()).unwrap();
        assert_eq!(caption, FigureCaption::Found("Figure 5: Below.".into()));

        let window = page.seen.borrow().unwrap();
        assert_eq!(
            window,
            CaptionSearchWindow {
                left: -200.0,
                top: 200.0,
                right: 500.0,
                bottom: 600.0
            }
        );
    }

    #[test]
    fn no_match_yields_sentinel() {
        let page = TextPage {
            text: "Results improve with depth.".into(),
            seen: RefCell::new(None),
        };
        let caption =
            locate_caption(&page, &region(), 300.0, 400.0, &RegexCaptionMatcher::default()).unwrap();
        assert_eq!(caption, FigureCaption::NotFound);
        assert_eq!(caption.to_string(), NO_CAPTION);
    }
}
