//! Result types produced by an extraction run.
//!
//! The persisted artifact is the [`ImageCaptionMap`]: a JSON object mapping
//! each `image{N}.png` to its caption, in image-id order. The richer
//! [`ImageRecord`]s and [`ExtractionStats`] are returned to library callers
//! and printed by `paperfig --json`.

use crate::error::PaperfigError;
use crate::geometry::MergedRegion;
use crate::pipeline::encode::write_atomic;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Caption text recorded for figures whose search window held no caption.
///
/// Downstream consumers filter on this exact string.
pub const NO_CAPTION: &str = "No Figure caption found";

/// Caption associated with one figure group.
///
/// Serialises as a plain string: the caption text, or [`NO_CAPTION`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FigureCaption {
    Found(String),
    NotFound,
}

impl FigureCaption {
    pub fn is_found(&self) -> bool {
        matches!(self, FigureCaption::Found(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            FigureCaption::Found(text) => text,
            FigureCaption::NotFound => NO_CAPTION,
        }
    }
}

impl From<String> for FigureCaption {
    fn from(s: String) -> Self {
        if s == NO_CAPTION {
            FigureCaption::NotFound
        } else {
            FigureCaption::Found(s)
        }
    }
}

impl From<FigureCaption> for String {
    fn from(c: FigureCaption) -> Self {
        match c {
            FigureCaption::Found(text) => text,
            FigureCaption::NotFound => NO_CAPTION.to_string(),
        }
    }
}

impl From<Option<String>> for FigureCaption {
    fn from(found: Option<String>) -> Self {
        found.map_or(FigureCaption::NotFound, FigureCaption::Found)
    }
}

impl fmt::Display for FigureCaption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One saved figure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageRecord {
    /// Document-wide image id, starting at 1.
    pub id: usize,
    /// `image{id}.png`
    pub filename: String,
    /// Full path the PNG was written to.
    pub path: PathBuf,
    /// 1-indexed page the figure was found on.
    pub page_num: usize,
    /// Merged rectangle of the group, in page points.
    pub region: MergedRegion,
    /// Number of embedded images merged into this figure.
    pub member_count: usize,
    pub caption: FigureCaption,
}

/// Insertion-ordered filename → caption lookup table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageCaptionMap {
    entries: IndexMap<String, FigureCaption>,
}

impl ImageCaptionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite an entry, returning the previous caption.
    ///
    /// An overwritten key keeps its original position.
    pub fn insert(
        &mut self,
        filename: impl Into<String>,
        caption: FigureCaption,
    ) -> Option<FigureCaption> {
        self.entries.insert(filename.into(), caption)
    }

    pub fn get(&self, filename: &str) -> Option<&FigureCaption> {
        self.entries.get(filename)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FigureCaption)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Entries whose caption was located, skipping sentinel values.
    pub fn captioned(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().filter_map(|(k, v)| match v {
            FigureCaption::Found(text) => Some((k.as_str(), text.as_str())),
            FigureCaption::NotFound => None,
        })
    }

    /// Pretty-printed JSON (two-space indent, non-ASCII kept verbatim).
    pub fn to_json_pretty(&self) -> Result<String, PaperfigError> {
        serde_json::to_string_pretty(self).map_err(|e| PaperfigError::Internal(e.to_string()))
    }

    /// Parse a strict JSON object of filename → caption strings.
    pub fn from_json_str(text: &str) -> Result<Self, PaperfigError> {
        serde_json::from_str(text).map_err(|e| PaperfigError::MapParseFailed {
            detail: e.to_string(),
        })
    }

    /// Write the map to `path`, replacing any previous file atomically.
    pub fn write_to(&self, path: &Path) -> Result<(), PaperfigError> {
        let json = self.to_json_pretty()?;
        write_atomic(path, json.as_bytes())
    }

    /// Load a map previously written by [`Self::write_to`].
    pub fn load(path: &Path) -> Result<Self, PaperfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => PaperfigError::FileNotFound {
                path: path.to_path_buf(),
            },
            std::io::ErrorKind::PermissionDenied => PaperfigError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => PaperfigError::Internal(format!("reading {}: {e}", path.display())),
        })?;
        Self::from_json_str(&text)
    }
}

impl<K: Into<String>> FromIterator<(K, FigureCaption)> for ImageCaptionMap {
    fn from_iter<I: IntoIterator<Item = (K, FigureCaption)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// What happened on one scanned page.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PageSummary {
    /// 1-indexed page number.
    pub page_num: usize,
    /// Embedded image references found on the page.
    pub image_refs: usize,
    /// References skipped because their bounding box was unusable.
    pub skipped: usize,
    /// Figure groups saved from the page.
    pub figures: usize,
}

/// Document-level metadata read from the PDF info dictionary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}

/// Aggregate counters for one extraction run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractionStats {
    /// Pages in the document.
    pub total_pages: usize,
    /// Pages actually scanned (after page selection).
    pub scanned_pages: usize,
    pub image_refs: usize,
    pub skipped_images: usize,
    pub figures: usize,
    pub captioned: usize,
    pub uncaptioned: usize,
    pub total_duration_ms: u64,
    /// Time spent rendering figure regions.
    pub render_duration_ms: u64,
}

/// Everything an extraction run produced.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionOutput {
    pub map: ImageCaptionMap,
    pub records: Vec<ImageRecord>,
    pub pages: Vec<PageSummary>,
    pub metadata: DocumentMetadata,
    pub stats: ExtractionStats,
    /// Where the caption map was written.
    pub map_path: PathBuf,
}

/// Plain text of the scanned pages, in page order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DocumentText {
    /// `(1-indexed page number, page text)` pairs.
    pub pages: Vec<(usize, String)>,
}

impl DocumentText {
    /// All page texts concatenated without separators.
    pub fn joined(&self) -> String {
        self.pages.iter().map(|(_, text)| text.as_str()).collect()
    }
}
