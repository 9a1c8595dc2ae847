//! PNG encoding and atomic artifact writes.
//!
//! Figures are written as PNG: lossless output keeps thin plot lines and
//! small axis labels legible when the image is placed on a slide. Every
//! artifact (figure or caption map) goes through [`write_atomic`], so a
//! crash never leaves a truncated `image{N}.png` or half-written JSON
//! behind for a downstream stage to pick up.

use crate::error::PaperfigError;
use image::DynamicImage;
use std::io::{Cursor, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Encode a rendered figure as PNG bytes.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    debug!(
        "Encoded {}x{} figure → {} bytes PNG",
        img.width(),
        img.height(),
        buf.len()
    );
    Ok(buf)
}

/// Write `bytes` to `path` via a temp file in the same directory + rename.
///
/// The parent directory is created when missing.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PaperfigError> {
    let write_err = |source: std::io::Error| PaperfigError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(write_err)?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}
