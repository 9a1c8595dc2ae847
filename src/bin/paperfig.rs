//! CLI binary for paperfig.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ExtractionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use paperfig::{
    apply_corrections, complete_from_full_captions, extract_figures, extract_text, inspect,
    parse_caption_map, parse_full_captions, ExtractionConfig, ExtractionProgressCallback,
    ImageCaptionMap, ImageRecord, PageSelection, ProgressCallback, SkipReason,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar over the selected pages and a log
/// line per saved figure.
struct CliProgressCallback {
    bar: ProgressBar,
    skipped: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner until `on_extraction_start` reports the page count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            skipped: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Scanning");
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Scanning {total_pages} pages for figures…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_image_skipped(&self, page_num: usize, reason: &SkipReason) {
        self.skipped.fetch_add(1, Ordering::SeqCst);
        self.bar
            .println(format!("  {} Page {:>3}  {}", yellow("!"), page_num, dim(&reason.to_string())));
    }

    fn on_figure_saved(&self, page_num: usize, record: &ImageRecord) {
        let caption = record.caption.as_str();
        let caption = if caption.chars().count() > 70 {
            let cut: String = caption.chars().take(69).collect();
            format!("{cut}\u{2026}")
        } else {
            caption.to_string()
        };
        let mark = if record.caption.is_found() {
            green("✓")
        } else {
            dim("·")
        };
        self.bar.println(format!(
            "  {} Page {:>3}  {:<12} {}",
            mark,
            page_num,
            record.filename,
            dim(&caption),
        ));
    }

    fn on_page_complete(&self, _page_num: usize, _total: usize, _figures: usize) {
        self.bar.inc(1);
    }

    fn on_extraction_complete(&self, total_pages: usize, figures: usize) {
        self.bar.finish_and_clear();
        let skipped = self.skipped.load(Ordering::SeqCst);
        eprintln!(
            "{} {} figures from {} pages{}",
            green("✔"),
            bold(&figures.to_string()),
            total_pages,
            if skipped > 0 {
                format!("  ({} image refs skipped)", yellow(&skipped.to_string()))
            } else {
                String::new()
            }
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract figures into ./images
  paperfig paper.pdf

  # Custom output directory, lower zoom
  paperfig paper.pdf -o figures --zoom 4

  # Only pages 3 to 8, tighter grouping
  paperfig --pages 3-8 --gap-tolerance 40 paper.pdf

  # From an arXiv URL, JSON report on stdout
  paperfig https://arxiv.org/pdf/1706.03762 --json > report.json

  # Dump page text alongside the figures
  paperfig paper.pdf --text paper.txt

  # Inspect PDF metadata only
  paperfig --inspect-only paper.pdf

  # Merge a correction response into images/image_captions.json
  paperfig paper.pdf --apply-corrections response.json

  # Complete truncated captions from a full caption listing
  paperfig paper.pdf --full-captions captions.txt

OUTPUT:
  <DIR>/image1.png, image2.png, …   one PNG per figure, numbered across the document
  <DIR>/image_captions.json         {"image1.png": "Figure 1: …", "image2.png": "No Figure caption found"}

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH   Path to libpdfium (otherwise ./ then system paths)
  RUST_LOG          Override log filter (e.g. paperfig=debug)
  PAPERFIG_*        Every flag, e.g. PAPERFIG_ZOOM=4
"#;

/// Extract figures and captions from research-paper PDFs.
#[derive(Parser, Debug)]
#[command(
    name = "paperfig",
    version,
    about = "Extract figures and their captions from research-paper PDFs",
    long_about = "Find embedded images in a PDF, merge side-by-side panels into one figure, \
render each figure to PNG and attach the 'Figure N:' caption found beneath it. Writes \
image{N}.png files and a filename → caption JSON map.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Directory for figure PNGs and the caption map.
    #[arg(short, long, env = "PAPERFIG_OUTPUT_DIR", default_value = "images")]
    output_dir: PathBuf,

    /// Max top-edge difference (points) for two images to share a row.
    #[arg(long, env = "PAPERFIG_ROW_TOLERANCE", default_value_t = 80.0)]
    row_tolerance: f64,

    /// Max horizontal gap (points) between neighbouring panels.
    #[arg(long, env = "PAPERFIG_GAP_TOLERANCE", default_value_t = 100.0)]
    gap_tolerance: f64,

    /// Rendering magnification for figure PNGs (0–50].
    #[arg(long, env = "PAPERFIG_ZOOM", default_value_t = 10.0)]
    zoom: f64,

    /// Caption window expansion left and right of a figure (points).
    #[arg(long, env = "PAPERFIG_CAPTION_MARGIN", default_value_t = 300.0)]
    caption_margin: f64,

    /// Caption window depth below a figure (points).
    #[arg(long, env = "PAPERFIG_CAPTION_DEPTH", default_value_t = 400.0)]
    caption_depth: f64,

    /// Regular expression recognising a caption.
    #[arg(long, env = "PAPERFIG_CAPTION_PATTERN")]
    caption_pattern: Option<String>,

    /// File name of the caption map inside the output directory.
    #[arg(long, env = "PAPERFIG_MAP_NAME", default_value = "image_captions.json")]
    map_name: String,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "PAPERFIG_PAGES", default_value = "all")]
    pages: String,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PAPERFIG_PASSWORD")]
    password: Option<String>,

    /// Also write the selected pages' plain text to this file.
    #[arg(long, env = "PAPERFIG_TEXT")]
    text: Option<PathBuf>,

    /// Print the full extraction report as JSON on stdout.
    #[arg(long, env = "PAPERFIG_JSON")]
    json: bool,

    /// Print PDF metadata only, no extraction.
    #[arg(long)]
    inspect_only: bool,

    /// Merge a correction response (filename → caption JSON) into the
    /// existing map instead of extracting.
    #[arg(long, env = "PAPERFIG_APPLY_CORRECTIONS", conflicts_with = "full_captions")]
    apply_corrections: Option<PathBuf>,

    /// Complete the existing map's captions from a full caption listing
    /// instead of extracting.
    #[arg(long, env = "PAPERFIG_FULL_CAPTIONS")]
    full_captions: Option<PathBuf>,

    /// Disable progress bar.
    #[arg(long, env = "PAPERFIG_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PAPERFIG_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PAPERFIG_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PAPERFIG_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs unless -v is given.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let meta = inspect(&cli.input).await.context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", cli.input);
            if let Some(ref t) = meta.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = meta.author {
                println!("Author:       {}", a);
            }
            println!("Pages:        {}", meta.page_count);
            println!("PDF Version:  {}", meta.pdf_version);
            if let Some(ref p) = meta.producer {
                println!("Producer:     {}", p);
            }
        }
        return Ok(());
    }

    // ── Correction modes (no extraction) ─────────────────────────────────
    let config = build_config(&cli, None)?;
    if let Some(ref response) = cli.apply_corrections {
        let base = ImageCaptionMap::load(&config.map_path())
            .with_context(|| format!("Failed to read {}", config.map_path().display()))?;
        let text = std::fs::read_to_string(response)
            .with_context(|| format!("Failed to read {}", response.display()))?;
        let corrected = parse_caption_map(&text).context("Invalid correction response")?;
        let merged = apply_corrections(&base, &corrected);
        return write_corrected(&config.map_path(), &merged, cli.quiet);
    }

    if let Some(ref listing) = cli.full_captions {
        let base = ImageCaptionMap::load(&config.map_path())
            .with_context(|| format!("Failed to read {}", config.map_path().display()))?;
        let text = std::fs::read_to_string(listing)
            .with_context(|| format!("Failed to read {}", listing.display()))?;
        let merged = complete_from_full_captions(&base, &parse_full_captions(&text));
        return write_corrected(&config.map_path(), &merged, cli.quiet);
    }

    // ── Run extraction ───────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    let output = extract_figures(&cli.input, &config)
        .await
        .context("Extraction failed")?;

    if let Some(ref text_path) = cli.text {
        let text = extract_text(&cli.input, &config)
            .await
            .context("Text extraction failed")?;
        std::fs::write(text_path, text.joined())
            .with_context(|| format!("Failed to write {}", text_path.display()))?;
    }

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if !cli.quiet {
        if !show_progress {
            eprintln!(
                "Extracted {} figures ({} captioned) from {} pages in {}ms",
                output.stats.figures,
                output.stats.captioned,
                output.stats.scanned_pages,
                output.stats.total_duration_ms
            );
        }
        eprintln!(
            "   {}  →  {}",
            dim(&format!("{} uncaptioned", output.stats.uncaptioned)),
            bold(&output.map_path.display().to_string()),
        );
    }

    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let pages = parse_pages(&cli.pages)?;

    let mut builder = ExtractionConfig::builder()
        .output_dir(&cli.output_dir)
        .map_filename(&cli.map_name)
        .row_tolerance(cli.row_tolerance)
        .gap_tolerance(cli.gap_tolerance)
        .zoom(cli.zoom)
        .caption_margin(cli.caption_margin)
        .caption_depth(cli.caption_depth)
        .pages(pages)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref pattern) = cli.caption_pattern {
        builder = builder
            .caption_pattern(pattern)
            .context("Invalid --caption-pattern")?;
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Write `map` next to `map_path` as `<stem>.corrected.json`.
fn write_corrected(map_path: &Path, map: &ImageCaptionMap, quiet: bool) -> Result<()> {
    let stem = map_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image_captions".to_string());
    let out = map_path.with_file_name(format!("{stem}.corrected.json"));
    map.write_to(&out)
        .with_context(|| format!("Failed to write {}", out.display()))?;
    if !quiet {
        eprintln!("{} {} entries  →  {}", green("✔"), map.len(), bold(&out.display().to_string()));
    }
    Ok(())
}

/// Parse `--pages` string into `PageSelection`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start
            .trim()
            .parse()
            .context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;

        if start < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!("Invalid page range '{}-{}': start must be <= end", start, end);
        }
        return Ok(PageSelection::Range(start, end));
    }

    // Set: "1,3,5,7"
    if s.contains(',') {
        let pages: Vec<usize> = s
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<usize>()
                    .with_context(|| format!("Invalid page number: '{}'", p.trim()))
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(&p) = pages.iter().find(|&&p| p < 1) {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", p);
        }
        return Ok(PageSelection::Set(pages));
    }

    // Single page: "5"
    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }
    Ok(PageSelection::Single(page))
}
