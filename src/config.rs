//! Configuration types for figure and caption extraction.
//!
//! All extraction behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. Every tolerance, the zoom factor, the
//! caption window and the output location live in one struct so two runs can
//! be compared field by field.

use crate::error::PaperfigError;
use crate::pipeline::caption::{CaptionMatcher, RegexCaptionMatcher};
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default vertical tolerance for two boxes to sit on the same row.
pub const DEFAULT_ROW_TOLERANCE: f64 = 80.0;
/// Default maximum horizontal gap between neighbouring boxes of one figure.
pub const DEFAULT_GAP_TOLERANCE: f64 = 100.0;
/// Default magnification used when rasterising a merged region.
pub const DEFAULT_ZOOM: f64 = 10.0;
/// Default horizontal expansion of the caption window on each side.
pub const DEFAULT_CAPTION_MARGIN: f64 = 300.0;
/// Default depth of the caption window below a figure.
pub const DEFAULT_CAPTION_DEPTH: f64 = 400.0;
/// Default file name of the filename → caption map.
pub const DEFAULT_MAP_FILENAME: &str = "image_captions.json";
/// Default output directory for figures and the caption map.
pub const DEFAULT_OUTPUT_DIR: &str = "images";

/// Configuration for one figure-extraction run.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use paperfig::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .output_dir("out/figures")
///     .zoom(4.0)
///     .gap_tolerance(60.0)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Two boxes share a row when their top edges differ by strictly less
    /// than this many points. Default: 80.
    pub row_tolerance: f64,

    /// A box joins the current group when its left edge is strictly less
    /// than this many points past the previous member's right edge.
    /// Overlapping boxes always qualify. Default: 100.
    pub gap_tolerance: f64,

    /// Magnification applied when rendering a merged region. Default: 10.
    ///
    /// At 10× a 200 pt wide figure becomes a 2 000 px PNG, enough for slide
    /// decks projected full screen.
    pub zoom: f64,

    /// Horizontal expansion of the caption search window, per side. Default: 300.
    pub caption_margin: f64,

    /// Depth of the caption search window below the figure. Default: 400.
    pub caption_depth: f64,

    /// Directory receiving `image{N}.png` files and the caption map.
    /// Default: `images`.
    pub output_dir: PathBuf,

    /// File name of the caption map inside `output_dir`.
    /// Default: `image_captions.json`.
    pub map_filename: String,

    /// Strategy deciding which text in the search window is a caption.
    pub caption_matcher: Arc<dyn CaptionMatcher>,

    /// Page selection. Default: all pages.
    pub pages: PageSelection,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Optional progress sink notified as pages and figures are processed.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            row_tolerance: DEFAULT_ROW_TOLERANCE,
            gap_tolerance: DEFAULT_GAP_TOLERANCE,
            zoom: DEFAULT_ZOOM,
            caption_margin: DEFAULT_CAPTION_MARGIN,
            caption_depth: DEFAULT_CAPTION_DEPTH,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            map_filename: DEFAULT_MAP_FILENAME.to_string(),
            caption_matcher: Arc::new(RegexCaptionMatcher::default()),
            pages: PageSelection::default(),
            password: None,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("row_tolerance", &self.row_tolerance)
            .field("gap_tolerance", &self.gap_tolerance)
            .field("zoom", &self.zoom)
            .field("caption_margin", &self.caption_margin)
            .field("caption_depth", &self.caption_depth)
            .field("output_dir", &self.output_dir)
            .field("map_filename", &self.map_filename)
            .field("caption_matcher", &self.caption_matcher.describe())
            .field("pages", &self.pages)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ExtractionProgressCallback>"),
            )
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Full path of the caption map file.
    pub fn map_path(&self) -> PathBuf {
        self.output_dir.join(&self.map_filename)
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn row_tolerance(mut self, points: f64) -> Self {
        self.config.row_tolerance = points;
        self
    }

    pub fn gap_tolerance(mut self, points: f64) -> Self {
        self.config.gap_tolerance = points;
        self
    }

    pub fn zoom(mut self, zoom: f64) -> Self {
        self.config.zoom = zoom;
        self
    }

    pub fn caption_margin(mut self, points: f64) -> Self {
        self.config.caption_margin = points;
        self
    }

    pub fn caption_depth(mut self, points: f64) -> Self {
        self.config.caption_depth = points;
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn map_filename(mut self, name: impl Into<String>) -> Self {
        self.config.map_filename = name.into();
        self
    }

    pub fn caption_matcher(mut self, matcher: Arc<dyn CaptionMatcher>) -> Self {
        self.config.caption_matcher = matcher;
        self
    }

    /// Use a custom regular expression as the caption matcher.
    ///
    /// Fails with [`PaperfigError::InvalidCaptionPattern`] when the pattern
    /// does not compile.
    pub fn caption_pattern(self, pattern: &str) -> Result<Self, PaperfigError> {
        let matcher = RegexCaptionMatcher::new(pattern)?;
        Ok(self.caption_matcher(Arc::new(matcher)))
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, PaperfigError> {
        let c = &self.config;
        let finite = [
            ("row_tolerance", c.row_tolerance),
            ("gap_tolerance", c.gap_tolerance),
            ("zoom", c.zoom),
            ("caption_margin", c.caption_margin),
            ("caption_depth", c.caption_depth),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(PaperfigError::InvalidConfig(format!(
                    "{name} must be a finite number, got {value}"
                )));
            }
        }
        if c.row_tolerance <= 0.0 {
            return Err(PaperfigError::InvalidConfig(format!(
                "row_tolerance must be > 0, got {}",
                c.row_tolerance
            )));
        }
        if c.zoom <= 0.0 || c.zoom > 50.0 {
            return Err(PaperfigError::InvalidConfig(format!(
                "zoom must be in (0, 50], got {}",
                c.zoom
            )));
        }
        if c.caption_margin < 0.0 || c.caption_depth < 0.0 {
            return Err(PaperfigError::InvalidConfig(
                "caption_margin and caption_depth must be ≥ 0".into(),
            ));
        }
        if c.map_filename.trim().is_empty() {
            return Err(PaperfigError::InvalidConfig(
                "map_filename must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Specifies which pages of the PDF to scan for figures.
///
/// Image ids keep counting across the selected pages; skipping pages never
/// resets or reuses an id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Scan all pages (default).
    #[default]
    All,
    /// Scan a single page (1-indexed).
    Single(usize),
    /// Scan a contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Scan specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}
