//! Region rasterisation: turn a merged figure region into a PNG on disk.
//!
//! Backends render the region through [`FigurePage::render_region`]; this
//! stage encodes the bitmap and writes it atomically. The pdfium backend
//! allocates a bitmap the size of the region only, so memory grows with the
//! figure and not with the page.

use crate::error::PaperfigError;
use crate::geometry::MergedRegion;
use crate::pipeline::encode::{encode_png, write_atomic};
use crate::pipeline::source::FigurePage;
use image::GenericImageView;
use std::path::Path;
use tracing::debug;

/// Render `region` of `page` at `zoom` and save it as a PNG at `path`.
///
/// Returns the pixel dimensions of the written image.
pub fn rasterize_region<P: FigurePage + ?Sized>(
    page: &P,
    region: &MergedRegion,
    zoom: f64,
    path: &Path,
) -> Result<(u32, u32), PaperfigError> {
    let image = page.render_region(region, zoom)?;
    let (width, height) = image.dimensions();

    let bytes = encode_png(&image).map_err(|e| PaperfigError::ImageEncodeFailed {
        filename: file_label(path),
        detail: e.to_string(),
    })?;
    write_atomic(path, &bytes)?;

    debug!(
        "Page {}: wrote {} ({}x{} px, {} bytes)",
        page.page_num(),
        path.display(),
        width,
        height,
        bytes.len()
    );
    Ok((width, height))
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::CaptionSearchWindow;
    use crate::pipeline::source::BoxLookup;
    use image::{DynamicImage, Rgb, RgbImage};

    struct SolidPage;

    impl FigurePage for SolidPage {
        fn page_num(&self) -> usize {
            3
        }

        fn image_boxes(&self) -> Vec<BoxLookup> {
            Vec::new()
        }

        fn text_in(&self, _: &CaptionSearchWindow) -> Result<String, PaperfigError> {
            Ok(String::new())
        }

        fn render_region(&self, region: &MergedRegion, zoom: f64) -> Result<DynamicImage, PaperfigError> {
            let rect = region.pixel_rect(zoom, 1000, 1000);
            Ok(DynamicImage::ImageRgb8(RgbImage::from_pixel(
                rect.width,
                rect.height,
                Rgb([200, 10, 10]),
            )))
        }

        fn full_text(&self) -> Result<String, PaperfigError> {
            Ok(String::new())
        }
    }

    struct BrokenPage;

    impl FigurePage for BrokenPage {
        fn page_num(&self) -> usize {
            1
        }

        fn image_boxes(&self) -> Vec<BoxLookup> {
            Vec::new()
        }

        fn text_in(&self, _: &CaptionSearchWindow) -> Result<String, PaperfigError> {
            Ok(String::new())
        }

        fn render_region(&self, _: &MergedRegion, _: f64) -> Result<DynamicImage, PaperfigError> {
            Err(PaperfigError::RasterisationFailed {
                page: 1,
                detail: "bitmap allocation failed".into(),
            })
        }

        fn full_text(&self) -> Result<String, PaperfigError> {
            Ok(String::new())
        }
    }

    #[test]
    fn rasterize_writes_decodable_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("images").join("image1.png");
        let region = MergedRegion {
            left: 1.0,
            top: 1.0,
            right: 5.0,
            bottom: 3.0,
        };

        let dims = rasterize_region(&SolidPage, &region, 10.0, &path).unwrap();
        assert_eq!(dims, (40, 20));

        let decoded = image::open(&path).unwrap();
        assert_eq!(decoded.dimensions(), (40, 20));
        assert_eq!(decoded.to_rgb8().get_pixel(0, 0), &Rgb([200, 10, 10]));
    }

    #[test]
    fn render_failure_propagates_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image1.png");
        let region = MergedRegion {
            left: 0.0,
            top: 0.0,
            right: 1.0,
            bottom: 1.0,
        };
        let err = rasterize_region(&BrokenPage, &region, 1.0, &path).unwrap_err();
        assert!(matches!(err, PaperfigError::RasterisationFailed { page: 1, .. }));
        assert!(!path.exists());
    }
}
