//! Image-id allocation and the filename → caption map.
//!
//! One [`CaptionMapBuilder`] lives for one document. It hands out
//! `image{N}.png` slots with `N` counting from 1 across every scanned page,
//! records each figure's caption under its filename, and finally writes the
//! map as pretty-printed JSON next to the images. Numbered images left in
//! the directory by an earlier, larger run are removed so every
//! `image{N}.png` on disk has an entry in the map.

use crate::error::PaperfigError;
use crate::geometry::MergedRegion;
use crate::output::{FigureCaption, ImageCaptionMap, ImageRecord};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A reserved image id and the file it will be written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSlot {
    pub id: usize,
    pub filename: String,
    pub path: PathBuf,
}

/// Accumulates image records for one document.
#[derive(Debug)]
pub struct CaptionMapBuilder {
    output_dir: PathBuf,
    map_filename: String,
    next_id: usize,
    map: ImageCaptionMap,
    records: Vec<ImageRecord>,
}

impl CaptionMapBuilder {
    pub fn new(output_dir: impl Into<PathBuf>, map_filename: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            map_filename: map_filename.into(),
            next_id: 1,
            map: ImageCaptionMap::new(),
            records: Vec::new(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Claim the next image id.
    ///
    /// The counter advances here, so an id whose figure later fails to
    /// render is never handed out again.
    pub fn reserve(&mut self) -> ImageSlot {
        let id = self.next_id;
        self.next_id += 1;
        let filename = format!("image{id}.png");
        let path = self.output_dir.join(&filename);
        ImageSlot { id, filename, path }
    }

    /// Record the caption of a figure whose PNG has been written to `slot`.
    pub fn insert(
        &mut self,
        slot: ImageSlot,
        page_num: usize,
        region: MergedRegion,
        member_count: usize,
        caption: FigureCaption,
    ) -> &ImageRecord {
        if let Some(previous) = self.map.insert(slot.filename.clone(), caption.clone()) {
            warn!("Overwriting caption for {}: was {:?}", slot.filename, previous.as_str());
        }
        self.records.push(ImageRecord {
            id: slot.id,
            filename: slot.filename,
            path: slot.path,
            page_num,
            region,
            member_count,
            caption,
        });
        &self.records[self.records.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Write the map into the output directory and hand back everything
    /// collected.
    ///
    /// The map is written even when no figure was found, so downstream
    /// stages always find a (possibly empty) JSON object. Afterwards any
    /// `image{N}.png` with `N` past the last id handed out is deleted.
    pub fn finish(self) -> Result<(ImageCaptionMap, Vec<ImageRecord>, PathBuf), PaperfigError> {
        let map_path = self.output_dir.join(&self.map_filename);
        self.map.write_to(&map_path)?;
        self.remove_stale_images();
        info!(
            "Wrote {} caption entries to {}",
            self.map.len(),
            map_path.display()
        );
        Ok((self.map, self.records, map_path))
    }

    /// Delete numbered images this run did not produce.
    ///
    /// Failures are logged and otherwise ignored: the map is already
    /// written and correct.
    fn remove_stale_images(&self) {
        let entries = match std::fs::read_dir(&self.output_dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Cannot list {} for stale images: {e}", self.output_dir.display());
                return;
            }
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(id) = name.to_str().and_then(image_id) else {
                continue;
            };
            if id < self.next_id {
                continue;
            }
            let path = entry.path();
            match std::fs::remove_file(&path) {
                Ok(()) => debug!("Removed stale {}", path.display()),
                Err(e) => warn!("Could not remove stale {}: {e}", path.display()),
            }
        }
    }
}

/// Id of a file named `image{N}.png`, if it is one.
fn image_id(filename: &str) -> Option<usize> {
    let digits = filename.strip_prefix("image")?.strip_suffix(".png")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
