//! Streaming extraction API: receive each figure as soon as it is saved.
//!
//! Unlike [`crate::extract::extract_figures`], which returns once the whole
//! document is done, [`extract_stream`] yields an [`ImageRecord`] per
//! figure while the extractor is still working through later pages. Records
//! arrive strictly in document order. The caption map is written when the
//! extractor reaches the end of the document, just before the stream ends.
//!
//! A fatal error is delivered as the final `Err` item. Dropping the stream
//! stops the extractor after the figure it is currently saving; the caption
//! map is then not written.

use crate::config::ExtractionConfig;
use crate::error::PaperfigError;
use crate::extract::run_extraction;
use crate::output::ImageRecord;
use crate::pipeline::input;
use crate::pipeline::pdfium::{bind_pdfium, open_document};
use std::ops::ControlFlow;
use std::pin::Pin;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;
use tracing::{debug, info};

/// A boxed stream of saved figures.
pub type FigureStream = Pin<Box<dyn Stream<Item = Result<ImageRecord, PaperfigError>> + Send>>;

const CHANNEL_CAPACITY: usize = 16;

/// Extract figures from a PDF file or URL, streaming records as they are
/// written.
///
/// # Returns
/// - `Ok(FigureStream)` once the input is resolved
/// - `Err(PaperfigError)` when the input cannot be resolved (file not found,
///   not a PDF, download failure)
///
/// # Example
/// ```rust,no_run
/// use paperfig::{extract_stream, ExtractionConfig};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut figures = extract_stream("paper.pdf", &ExtractionConfig::default()).await?;
/// while let Some(figure) = figures.next().await {
///     let figure = figure?;
///     println!("page {}: {} {}", figure.page_num, figure.filename, figure.caption);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn extract_stream(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<FigureStream, PaperfigError> {
    let input_str = input_str.as_ref();
    info!("Starting streaming extraction: {}", input_str);

    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let cfg = config.clone();
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

    tokio::task::spawn_blocking(move || {
        // `resolved` moves in here so a downloaded temp file outlives the run.
        let result = bind_pdfium()
            .and_then(|pdfium| {
                let doc = open_document(&pdfium, resolved.path(), cfg.password.as_deref())?;
                run_extraction(&doc, &cfg, |record| {
                    if tx.blocking_send(Ok(record.clone())).is_err() {
                        debug!("Figure stream dropped; stopping after {}", record.filename);
                        return ControlFlow::Break(());
                    }
                    ControlFlow::Continue(())
                })
            });
        match result {
            Ok(_) | Err(PaperfigError::Cancelled) => {}
            Err(e) => {
                let _ = tx.blocking_send(Err(e));
            }
        }
    });

    Ok(Box::pin(ReceiverStream::new(rx)))
}
