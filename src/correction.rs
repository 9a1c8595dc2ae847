//! Hand-off to the caption-correction stage.
//!
//! Captions found below a figure are often truncated at the end of their
//! first text line. A later stage (typically a language model) receives the
//! caption map together with the paper's full caption list and answers
//! with a corrected filename → caption object. This module builds that
//! request, parses the answer and merges it back onto the map:
//!
//! 1. [`parse_full_captions`] turns a `Figure N` / caption-text listing into
//!    [`FullCaption`]s.
//! 2. [`CorrectionRequest`] bundles the map and the full captions as JSON.
//! 3. [`parse_caption_map`] reads the answer, tolerating a ```` ```json ````
//!    fence or prose around the object.
//! 4. [`apply_corrections`] merges the answer onto the original map.
//!
//! [`complete_from_full_captions`] does the same merge deterministically by
//! figure number, without any external stage.

use crate::error::PaperfigError;
use crate::output::{FigureCaption, ImageCaptionMap};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

// ── Full captions ────────────────────────────────────────────────────────────

/// A complete figure caption from the paper's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullCaption {
    /// Figure number as printed.
    pub number: u32,
    /// Label as printed, e.g. `Figure 3` or `Fig. 3`.
    pub label: String,
    /// Caption text after the label, lines joined with single spaces.
    pub text: String,
}

impl fmt::Display for FullCaption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.text.is_empty() {
            f.write_str(&self.label)
        } else {
            write!(f, "{}: {}", self.label, self.text)
        }
    }
}

static RE_FIGURE_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*[-*•]?\s*((?:Figure|Fig\.)\s?(\d+))\s*[:.]?\s*(.*)$").unwrap()
});

/// Parse a caption listing into [`FullCaption`]s, in listing order.
///
/// A line starting with `Figure N` or `Fig. N` opens a caption; text on the
/// same line after an optional `:` and following non-blank lines belong to
/// it until the next label. Lines before the first label are ignored.
pub fn parse_full_captions(listing: &str) -> Vec<FullCaption> {
    let mut captions: Vec<FullCaption> = Vec::new();

    for line in listing.lines() {
        if let Some(caps) = RE_FIGURE_LABEL.captures(line) {
            let Ok(number) = caps[2].parse::<u32>() else {
                continue;
            };
            captions.push(FullCaption {
                number,
                label: caps[1].to_string(),
                text: caps[3].trim().to_string(),
            });
            continue;
        }

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(current) = captions.last_mut() {
            if !current.text.is_empty() {
                current.text.push(' ');
            }
            current.text.push_str(line);
        }
    }

    debug!("Parsed {} full captions", captions.len());
    captions
}

// ── Request ──────────────────────────────────────────────────────────────────

/// Input bundle for the correction stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrectionRequest {
    /// Captions located below each figure, keyed by image filename.
    pub image_captions: ImageCaptionMap,
    /// Complete captions from the paper's text.
    pub figure_captions: Vec<FullCaption>,
}

impl CorrectionRequest {
    pub fn new(image_captions: ImageCaptionMap, full_caption_listing: &str) -> Self {
        Self {
            image_captions,
            figure_captions: parse_full_captions(full_caption_listing),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, PaperfigError> {
        serde_json::to_string_pretty(self).map_err(|e| PaperfigError::Internal(e.to_string()))
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

static RE_JSON_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json|JSON)?\s*\n(.*?)\n?```\s*$").unwrap());

/// Parse a filename → caption JSON object returned by the correction stage.
///
/// An outer ```` ```json ```` fence is stripped; failing a direct parse, the
/// outermost `{ … }` span of the text is tried. Values must be strings.
pub fn parse_caption_map(text: &str) -> Result<ImageCaptionMap, PaperfigError> {
    let trimmed = text.trim();
    let body = match RE_JSON_FENCE.captures(trimmed) {
        Some(caps) => caps.get(1).map_or("", |m| m.as_str()).trim(),
        None => trimmed,
    };

    match ImageCaptionMap::from_json_str(body) {
        Ok(map) => Ok(map),
        Err(first_err) => match outer_object(body) {
            Some(object) if object.len() < body.len() => {
                debug!("Retrying caption map parse on embedded JSON object");
                ImageCaptionMap::from_json_str(object)
            }
            _ => Err(first_err),
        },
    }
}

fn outer_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

// ── Merge ────────────────────────────────────────────────────────────────────

/// Merge `corrected` onto `base`, returning a new map in `base` order.
///
/// Only entries of `base` with a located caption are replaced, and only by
/// a non-empty corrected caption. Sentinel entries stay as they are; keys
/// that `base` does not know are dropped with a warning.
pub fn apply_corrections(base: &ImageCaptionMap, corrected: &ImageCaptionMap) -> ImageCaptionMap {
    for (filename, _) in corrected.iter() {
        if base.get(filename).is_none() {
            warn!("Ignoring correction for unknown image {}", filename);
        }
    }

    base.iter()
        .map(|(filename, caption)| {
            let replacement = match (caption, corrected.get(filename)) {
                (FigureCaption::Found(_), Some(FigureCaption::Found(text))) if !text.trim().is_empty() => {
                    Some(FigureCaption::Found(text.trim().to_string()))
                }
                _ => None,
            };
            (filename, replacement.unwrap_or_else(|| caption.clone()))
        })
        .collect()
}

static RE_CAPTION_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:Figure|Fig\.)\s?(\d+)").unwrap());

/// Replace each located caption with the full caption carrying the same
/// figure number, when `full` has one.
pub fn complete_from_full_captions(base: &ImageCaptionMap, full: &[FullCaption]) -> ImageCaptionMap {
    base.iter()
        .map(|(filename, caption)| {
            let completed = match caption {
                FigureCaption::Found(text) => caption_number(text)
                    .and_then(|n| full.iter().find(|c| c.number == n))
                    .map(|c| FigureCaption::Found(c.to_string())),
                FigureCaption::NotFound => None,
            };
            (filename, completed.unwrap_or_else(|| caption.clone()))
        })
        .collect()
}

fn caption_number(caption: &str) -> Option<u32> {
    RE_CAPTION_NUMBER
        .captures(caption.trim())
        .and_then(|caps| caps[1].parse().ok())
}
