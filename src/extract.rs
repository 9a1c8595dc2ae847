//! Eager (full-document) extraction entry points.
//!
//! [`extract_document`] is the synchronous driver over any
//! [`FigureDocument`]; the async functions resolve their input, bind
//! pdfium and run that driver on a blocking worker thread. Use
//! [`crate::stream::extract_stream`] instead to receive each figure as soon
//! as its PNG is on disk.

use crate::config::{ExtractionConfig, PageSelection};
use crate::error::PaperfigError;
use crate::output::{DocumentMetadata, DocumentText, ExtractionOutput, ExtractionStats, ImageRecord, PageSummary};
use crate::pipeline::caption::locate_caption;
use crate::pipeline::collect::collect_boxes;
use crate::pipeline::group::{group_boxes, GroupingTolerances};
use crate::pipeline::input::{self, check_pdf_magic};
use crate::pipeline::mapping::CaptionMapBuilder;
use crate::pipeline::pdfium::{bind_pdfium, open_document, open_document_from_bytes};
use crate::pipeline::render::rasterize_region;
use crate::pipeline::source::{FigureDocument, FigurePage};
use crate::progress::{ExtractionProgressCallback, NoopProgressCallback};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Extract every figure of `doc` and write the caption map.
///
/// Pages are visited in order; within a page, groups are rasterised and
/// captioned in reading order before the next page is loaded. Image ids
/// run from 1 across the whole document.
///
/// # Errors
/// Unreadable bounding boxes are skipped and counted. Everything else
/// (a page that fails to load, a failed render, an unwritable output
/// directory) aborts the run.
pub fn extract_document<D: FigureDocument + ?Sized>(
    doc: &D,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, PaperfigError> {
    run_extraction(doc, config, |_| ControlFlow::Continue(()))
}

/// [`extract_document`] with a hook invoked for each saved figure, in
/// document order.
///
/// A hook returning `Break` stops the run at once with
/// [`PaperfigError::Cancelled`]; the caption map is not written.
pub(crate) fn run_extraction<D, F>(
    doc: &D,
    config: &ExtractionConfig,
    mut on_record: F,
) -> Result<ExtractionOutput, PaperfigError>
where
    D: FigureDocument + ?Sized,
    F: FnMut(&ImageRecord) -> ControlFlow<()>,
{
    let total_start = Instant::now();
    let noop = NoopProgressCallback;
    let progress: &dyn ExtractionProgressCallback = match &config.progress_callback {
        Some(cb) => cb.as_ref(),
        None => &noop,
    };

    let total_pages = doc.page_count();
    let indices = select_pages(&config.pages, total_pages)?;
    let scanned = indices.len();
    let tolerances = GroupingTolerances {
        row: config.row_tolerance,
        gap: config.gap_tolerance,
    };

    info!(
        "Extracting figures from {} of {} pages into {}",
        scanned,
        total_pages,
        config.output_dir.display()
    );
    progress.on_extraction_start(scanned);

    let mut builder = CaptionMapBuilder::new(&config.output_dir, &config.map_filename);
    let mut pages = Vec::with_capacity(scanned);
    let mut render_ms = 0u64;

    for index in indices {
        let page = doc.page(index)?;
        let page_num = page.page_num();
        progress.on_page_start(page_num, scanned);

        let collected = collect_boxes(&page);
        for reason in &collected.skipped {
            progress.on_image_skipped(page_num, reason);
        }

        let groups = group_boxes(&collected.boxes, tolerances);
        for group in &groups {
            let region = group.merged_region();
            let slot = builder.reserve();

            let render_start = Instant::now();
            rasterize_region(&page, &region, config.zoom, &slot.path)?;
            render_ms += render_start.elapsed().as_millis() as u64;

            let caption = locate_caption(
                &page,
                &region,
                config.caption_margin,
                config.caption_depth,
                config.caption_matcher.as_ref(),
            )?;
            debug!(
                "Page {}: {} ({} boxes) -> {}",
                page_num,
                slot.filename,
                group.len(),
                caption
            );

            let record = builder.insert(slot, page_num, region, group.len(), caption);
            progress.on_figure_saved(page_num, record);
            if on_record(record).is_break() {
                info!("Extraction cancelled after {} on page {}", record.filename, page_num);
                return Err(PaperfigError::Cancelled);
            }
        }

        progress.on_page_complete(page_num, scanned, groups.len());
        pages.push(PageSummary {
            page_num,
            image_refs: collected.image_refs(),
            skipped: collected.skipped.len(),
            figures: groups.len(),
        });
    }

    let (map, records, map_path) = builder.finish()?;
    let metadata = doc.metadata();

    let captioned = records.iter().filter(|r| r.caption.is_found()).count();
    let stats = ExtractionStats {
        total_pages,
        scanned_pages: scanned,
        image_refs: pages.iter().map(|p| p.image_refs).sum(),
        skipped_images: pages.iter().map(|p| p.skipped).sum(),
        figures: records.len(),
        captioned,
        uncaptioned: records.len() - captioned,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        render_duration_ms: render_ms,
    };

    info!(
        "Extraction complete: {} figures ({} captioned) from {} pages in {}ms",
        stats.figures, stats.captioned, stats.scanned_pages, stats.total_duration_ms
    );
    progress.on_extraction_complete(scanned, stats.figures);

    Ok(ExtractionOutput {
        map,
        records,
        pages,
        metadata,
        stats,
        map_path,
    })
}

/// Plain text of the selected pages of `doc`, in page order.
pub fn document_text<D: FigureDocument + ?Sized>(
    doc: &D,
    selection: &PageSelection,
) -> Result<DocumentText, PaperfigError> {
    let indices = select_pages(selection, doc.page_count())?;
    let mut pages = Vec::with_capacity(indices.len());
    for index in indices {
        let page = doc.page(index)?;
        pages.push((page.page_num(), page.full_text()?));
    }
    Ok(DocumentText { pages })
}

/// Resolve `selection` against a document of `total_pages`.
///
/// Out-of-range entries are dropped with a warning; a selection that keeps
/// no page at all is an error. An empty document scans nothing.
pub(crate) fn select_pages(
    selection: &PageSelection,
    total_pages: usize,
) -> Result<Vec<usize>, PaperfigError> {
    let indices = selection.to_indices(total_pages);
    let requested = match selection {
        PageSelection::All => return Ok(indices),
        PageSelection::Single(p) => vec![*p],
        PageSelection::Range(start, end) => vec![*start, *end],
        PageSelection::Set(pages) => pages.clone(),
    };

    for &page in &requested {
        if page == 0 || page > total_pages {
            warn!("Page {} is out of range (document has {} pages)", page, total_pages);
        }
    }

    if indices.is_empty() {
        return Err(PaperfigError::PageOutOfRange {
            page: requested.first().copied().unwrap_or(0),
            total: total_pages,
        });
    }
    Ok(indices)
}

// ── Async entry points ───────────────────────────────────────────────────

/// Extract figures and captions from a PDF file or URL.
///
/// This is the primary entry point for the library. Images and the caption
/// map are written under `config.output_dir`.
///
/// # Example
/// ```rust,no_run
/// use paperfig::{extract_figures, ExtractionConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = ExtractionConfig::builder().output_dir("figures").build()?;
///     let output = extract_figures("paper.pdf", &config).await?;
///     for (file, caption) in output.map.captioned() {
///         println!("{file}: {caption}");
///     }
///     Ok(())
/// }
/// ```
pub async fn extract_figures(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, PaperfigError> {
    let input_str = input_str.as_ref();
    info!("Starting extraction: {}", input_str);

    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let path = resolved.path().to_path_buf();
    let cfg = config.clone();

    let output = tokio::task::spawn_blocking(move || extract_blocking(&path, &cfg))
        .await
        .map_err(|e| PaperfigError::Internal(format!("Extraction task panicked: {}", e)))??;

    // `resolved` (and any downloaded temp file) lives until here.
    drop(resolved);
    Ok(output)
}

fn extract_blocking(path: &Path, config: &ExtractionConfig) -> Result<ExtractionOutput, PaperfigError> {
    let pdfium = bind_pdfium()?;
    let doc = open_document(&pdfium, path, config.password.as_deref())?;
    extract_document(&doc, config)
}

/// Synchronous wrapper around [`extract_figures`].
///
/// Creates a temporary tokio runtime internally; do not call from inside
/// an async context.
pub fn extract_figures_sync(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, PaperfigError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PaperfigError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract_figures(input_str, config))
}

/// Extract figures from PDF bytes held in memory.
///
/// # Example
/// ```rust,no_run
/// use paperfig::{extract_from_bytes, ExtractionConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes: Vec<u8> = std::fs::read("paper.pdf")?;
/// let output = extract_from_bytes(&bytes, &ExtractionConfig::default()).await?;
/// println!("{} figures", output.stats.figures);
/// # Ok(())
/// # }
/// ```
pub async fn extract_from_bytes(
    bytes: &[u8],
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, PaperfigError> {
    let label = PathBuf::from("<memory>");
    check_pdf_magic(bytes, &label)?;

    let bytes = bytes.to_vec();
    let cfg = config.clone();
    tokio::task::spawn_blocking(move || {
        let pdfium = bind_pdfium()?;
        let doc = open_document_from_bytes(&pdfium, bytes, &label, cfg.password.as_deref())?;
        extract_document(&doc, &cfg)
    })
    .await
    .map_err(|e| PaperfigError::Internal(format!("Extraction task panicked: {}", e)))?
}

/// Read document metadata without extracting anything.
pub async fn inspect(input_str: impl AsRef<str>) -> Result<DocumentMetadata, PaperfigError> {
    let resolved = input::resolve_input(input_str.as_ref(), 120).await?;
    let path = resolved.path().to_path_buf();

    let metadata = tokio::task::spawn_blocking(move || {
        let pdfium = bind_pdfium()?;
        let doc = open_document(&pdfium, &path, None)?;
        Ok::<_, PaperfigError>(doc.metadata())
    })
    .await
    .map_err(|e| PaperfigError::Internal(format!("Metadata task panicked: {}", e)))??;

    drop(resolved);
    Ok(metadata)
}

/// Plain text of the selected pages of a PDF file or URL.
///
/// Honours `config.pages`, `config.password` and
/// `config.download_timeout_secs`; nothing is written to disk.
pub async fn extract_text(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<DocumentText, PaperfigError> {
    let resolved = input::resolve_input(input_str.as_ref(), config.download_timeout_secs).await?;
    let path = resolved.path().to_path_buf();
    let password = config.password.clone();
    let selection = config.pages.clone();

    let text = tokio::task::spawn_blocking(move || {
        let pdfium = bind_pdfium()?;
        let doc = open_document(&pdfium, &path, password.as_deref())?;
        document_text(&doc, &selection)
    })
    .await
    .map_err(|e| PaperfigError::Internal(format!("Text task panicked: {}", e)))??;

    drop(resolved);
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{BoundingBox, CaptionSearchWindow, MergedRegion};
    use crate::pipeline::source::BoxLookup;
    use image::{DynamicImage, Rgb, RgbImage};

    #[test]
    fn select_all_of_empty_document_is_empty() {
        assert!(select_pages(&PageSelection::All, 0).unwrap().is_empty());
    }

    #[test]
    fn select_keeps_in_range_pages() {
        let pages = select_pages(&PageSelection::Set(vec![2, 9]), 3).unwrap();
        assert_eq!(pages, vec![1]);
    }

    #[test]
    fn select_nothing_in_range_is_error() {
        let err = select_pages(&PageSelection::Single(5), 3).unwrap_err();
        assert!(matches!(err, PaperfigError::PageOutOfRange { page: 5, total: 3 }));
    }

    struct BoxPage {
        num: usize,
        boxes: Vec<BoundingBox>,
    }

    impl FigurePage for BoxPage {
        fn page_num(&self) -> usize {
            self.num
        }

        fn image_boxes(&self) -> Vec<BoxLookup> {
            self.boxes.iter().copied().map(Ok).collect()
        }

        fn text_in(&self, _: &CaptionSearchWindow) -> Result<String, PaperfigError> {
            Ok(String::new())
        }

        fn render_region(&self, region: &MergedRegion, zoom: f64) -> Result<DynamicImage, PaperfigError> {
            let rect = region.pixel_rect(zoom, 1000, 1000);
            Ok(DynamicImage::ImageRgb8(RgbImage::from_pixel(rect.width, rect.height, Rgb([0, 0, 0]))))
        }

        fn full_text(&self) -> Result<String, PaperfigError> {
            Ok(String::new())
        }
    }

    /// One lone image per page.
    struct ThreePages;

    impl FigureDocument for ThreePages {
        type Page<'p> = BoxPage;

        fn page_count(&self) -> usize {
            3
        }

        fn page(&self, index: usize) -> Result<BoxPage, PaperfigError> {
            Ok(BoxPage {
                num: index + 1,
                boxes: vec![BoundingBox::new(10.0, 10.0, 60.0, 40.0)],
            })
        }
    }

    fn config_in(dir: &tempfile::TempDir) -> ExtractionConfig {
        ExtractionConfig::builder().output_dir(dir.path()).build().unwrap()
    }

    #[test]
    fn every_record_reaches_the_hook_when_it_continues() {
        let dir = tempfile::tempdir().unwrap();
        let mut seen = Vec::new();
        let output = run_extraction(&ThreePages, &config_in(&dir), |record| {
            seen.push(record.filename.clone());
            ControlFlow::Continue(())
        })
        .unwrap();
        assert_eq!(seen, ["image1.png", "image2.png", "image3.png"]);
        assert_eq!(output.map.len(), 3);
    }

    #[test]
    fn break_from_hook_stops_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut calls = 0;
        let err = run_extraction(&ThreePages, &config_in(&dir), |_| {
            calls += 1;
            ControlFlow::Break(())
        })
        .unwrap_err();

        assert!(matches!(err, PaperfigError::Cancelled));
        assert_eq!(calls, 1);
        assert!(dir.path().join("image1.png").exists());
        assert!(!dir.path().join("image2.png").exists());
        assert!(!dir.path().join("image_captions.json").exists());
    }

    #[tokio::test]
    async fn bytes_without_pdf_header_are_rejected_before_binding() {
        let err = extract_from_bytes(b"PK\x03\x04zip", &ExtractionConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PaperfigError::NotAPdf { .. }));
    }
}
