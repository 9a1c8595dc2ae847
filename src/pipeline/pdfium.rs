//! pdfium backend for [`FigureDocument`] / [`FigurePage`].
//!
//! pdfium reports geometry in PDF user space: origin at the bottom-left
//! corner, `y` growing upwards. Everything leaving this module is converted
//! to top-down page space (`top = page_height − pdf_top`), and text queries
//! are converted back before they reach pdfium.
//!
//! All calls here are blocking and CPU-bound; the async entry points run
//! them inside `tokio::task::spawn_blocking`.

use crate::error::{PaperfigError, SkipReason};
use crate::geometry::{BoundingBox, CaptionSearchWindow, MergedRegion, PixelRect};
use crate::output::DocumentMetadata;
use crate::pipeline::source::{BoxLookup, FigureDocument, FigurePage};
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Bind to a pdfium shared library.
///
/// Search order: `PDFIUM_LIB_PATH`, the working directory, then the system
/// library path.
pub fn bind_pdfium() -> Result<Pdfium, PaperfigError> {
    let from_env = std::env::var("PDFIUM_LIB_PATH")
        .ok()
        .filter(|p| !p.is_empty())
        .map(|p| Pdfium::bind_to_library(&p));

    let bindings = match from_env {
        Some(Ok(bindings)) => Ok(bindings),
        Some(Err(e)) => {
            debug!("PDFIUM_LIB_PATH bind failed: {:?}", e);
            bind_local_or_system()
        }
        None => bind_local_or_system(),
    }
    .map_err(|e| PaperfigError::PdfiumBindingFailed(format!("{e:?}")))?;

    Ok(Pdfium::new(bindings))
}

fn bind_local_or_system() -> Result<Box<dyn PdfiumLibraryBindings>, PdfiumError> {
    Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
}

/// A PDF opened through pdfium.
pub struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
    origin: PathBuf,
}

/// Open the PDF at `path`.
pub fn open_document<'a>(
    pdfium: &'a Pdfium,
    path: &Path,
    password: Option<&'a str>,
) -> Result<PdfiumDocument<'a>, PaperfigError> {
    let document = pdfium
        .load_pdf_from_file(path, password)
        .map_err(|e| load_error(e, path, password))?;
    info!("PDF loaded: {} ({} pages)", path.display(), document.pages().len());
    Ok(PdfiumDocument {
        document,
        origin: path.to_path_buf(),
    })
}

/// Open a PDF held in memory. `label` names it in errors.
pub fn open_document_from_bytes<'a>(
    pdfium: &'a Pdfium,
    bytes: Vec<u8>,
    label: &Path,
    password: Option<&'a str>,
) -> Result<PdfiumDocument<'a>, PaperfigError> {
    let document = pdfium
        .load_pdf_from_byte_vec(bytes, password)
        .map_err(|e| load_error(e, label, password))?;
    info!("PDF loaded from memory ({} pages)", document.pages().len());
    Ok(PdfiumDocument {
        document,
        origin: label.to_path_buf(),
    })
}

fn load_error(e: PdfiumError, path: &Path, password: Option<&str>) -> PaperfigError {
    let detail = format!("{:?}", e);
    if detail.contains("Password") || detail.contains("password") {
        if password.is_some() {
            PaperfigError::WrongPassword {
                path: path.to_path_buf(),
            }
        } else {
            PaperfigError::PasswordRequired {
                path: path.to_path_buf(),
            }
        }
    } else {
        PaperfigError::CorruptPdf {
            path: path.to_path_buf(),
            detail,
        }
    }
}

impl PdfiumDocument<'_> {
    pub fn origin(&self) -> &Path {
        &self.origin
    }
}

impl<'a> FigureDocument for PdfiumDocument<'a> {
    type Page<'p>
        = PdfiumPage<'p>
    where
        Self: 'p;

    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn page(&self, index: usize) -> Result<PdfiumPage<'_>, PaperfigError> {
        let page_num = index + 1;
        let total = self.page_count();
        let page_index = u16::try_from(index)
            .ok()
            .filter(|_| index < total)
            .ok_or(PaperfigError::PageOutOfRange {
                page: page_num,
                total,
            })?;

        let page = self
            .document
            .pages()
            .get(page_index)
            .map_err(|e| PaperfigError::PageLoadFailed {
                page: page_num,
                detail: format!("{:?}", e),
            })?;

        Ok(PdfiumPage {
            width: f64::from(page.width().value),
            height: f64::from(page.height().value),
            page,
            page_num,
        })
    }

    fn metadata(&self) -> DocumentMetadata {
        let metadata = self.document.metadata();
        let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
            metadata.get(tag).and_then(|t| {
                let v = t.value().trim().to_string();
                if v.is_empty() {
                    None
                } else {
                    Some(v)
                }
            })
        };

        DocumentMetadata {
            title: get_meta(PdfDocumentMetadataTagType::Title),
            author: get_meta(PdfDocumentMetadataTagType::Author),
            subject: get_meta(PdfDocumentMetadataTagType::Subject),
            creator: get_meta(PdfDocumentMetadataTagType::Creator),
            producer: get_meta(PdfDocumentMetadataTagType::Producer),
            creation_date: get_meta(PdfDocumentMetadataTagType::CreationDate),
            modification_date: get_meta(PdfDocumentMetadataTagType::ModificationDate),
            page_count: self.page_count(),
            pdf_version: format!("{:?}", self.document.version()),
        }
    }
}

/// One loaded page.
pub struct PdfiumPage<'a> {
    page: PdfPage<'a>,
    page_num: usize,
    width: f64,
    height: f64,
}

/// Top-down box of an object whose PDF user-space edges are given, on a
/// page `page_height` points tall.
pub(crate) fn to_top_down(page_height: f64, left: f64, bottom: f64, right: f64, top: f64) -> BoundingBox {
    BoundingBox::new(left, page_height - top, right, page_height - bottom)
}

/// PDF user-space `(bottom, left, top, right)` of a top-down window, in the
/// argument order of `PdfRect::new_from_values`.
pub(crate) fn window_to_pdf(page_height: f64, window: &CaptionSearchWindow) -> (f64, f64, f64, f64) {
    (
        page_height - window.bottom,
        window.left,
        page_height - window.top,
        window.right,
    )
}

/// Bitmap size and page shift for rendering a single region.
///
/// pdfium applies the custom render matrix in top-down page points before
/// the zoom, so shifting the page by `(shift_x, shift_y)` points puts the
/// region's first pixel at the bitmap origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct RegionRaster {
    pub rect: PixelRect,
    pub shift_x: f64,
    pub shift_y: f64,
}

impl RegionRaster {
    pub(crate) fn plan(region: &MergedRegion, zoom: f64, page_width: f64, page_height: f64) -> Self {
        let page_px = |points: f64| (points * zoom).ceil().max(1.0) as u32;
        let rect = region.pixel_rect(zoom, page_px(page_width), page_px(page_height));
        Self {
            rect,
            shift_x: -f64::from(rect.x) / zoom,
            shift_y: -f64::from(rect.y) / zoom,
        }
    }
}

impl PdfiumPage<'_> {
    fn raster_error(&self, detail: impl std::fmt::Debug) -> PaperfigError {
        PaperfigError::RasterisationFailed {
            page: self.page_num,
            detail: format!("{:?}", detail),
        }
    }
}

impl FigurePage for PdfiumPage<'_> {
    fn page_num(&self) -> usize {
        self.page_num
    }

    fn image_boxes(&self) -> Vec<BoxLookup> {
        self.page
            .objects()
            .iter()
            .filter(|object| object.object_type() == PdfPageObjectType::Image)
            .enumerate()
            .map(|(index, object)| {
                let bounds = object.bounds().map_err(|e| SkipReason::BoundsUnavailable {
                    index,
                    detail: format!("{:?}", e),
                })?;
                Ok(to_top_down(
                    self.height,
                    f64::from(bounds.left().value),
                    f64::from(bounds.bottom().value),
                    f64::from(bounds.right().value),
                    f64::from(bounds.top().value),
                ))
            })
            .collect()
    }

    fn text_in(&self, window: &CaptionSearchWindow) -> Result<String, PaperfigError> {
        let text = self
            .page
            .text()
            .map_err(|e| PaperfigError::TextExtractionFailed {
                page: self.page_num,
                detail: format!("{:?}", e),
            })?;
        let (bottom, left, top, right) = window_to_pdf(self.height, window);
        let rect = PdfRect::new_from_values(bottom as f32, left as f32, top as f32, right as f32);
        Ok(text.inside_rect(rect))
    }

    fn render_region(&self, region: &MergedRegion, zoom: f64) -> Result<DynamicImage, PaperfigError> {
        let plan = RegionRaster::plan(region, zoom, self.width, self.height);
        let width = i32::try_from(plan.rect.width).map_err(|e| self.raster_error(e))?;
        let height = i32::try_from(plan.rect.height).map_err(|e| self.raster_error(e))?;

        let mut bitmap = PdfBitmap::empty(width, height, PdfBitmapFormat::BGRA, self.page.bindings())
            .map_err(|e| self.raster_error(e))?;
        let config = PdfRenderConfig::new()
            .scale_page_by_factor(zoom as f32)
            .translate(
                PdfPoints::new(plan.shift_x as f32),
                PdfPoints::new(plan.shift_y as f32),
            )
            .map_err(|e| self.raster_error(e))?;
        self.page
            .render_into_bitmap_with_config(&mut bitmap, &config)
            .map_err(|e| self.raster_error(e))?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} region at {}x → {}x{} px",
            self.page_num,
            zoom,
            image.width(),
            image.height()
        );
        Ok(image)
    }

    fn full_text(&self) -> Result<String, PaperfigError> {
        let text = self
            .page
            .text()
            .map_err(|e| PaperfigError::TextExtractionFailed {
                page: self.page_num,
                detail: format!("{:?}", e),
            })?;
        Ok(text.all())
    }
}
