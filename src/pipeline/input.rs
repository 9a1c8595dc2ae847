//! Input resolution: turn a path or URL into a local PDF file.
//!
//! URL inputs (typically arXiv links) are downloaded into a `TempDir` that
//! lives as long as the [`ResolvedInput`], so the file is removed once the
//! extraction finishes. Both paths check the `%PDF` magic bytes first, which
//! turns "this is an HTML error page" into [`PaperfigError::NotAPdf`]
//! instead of an opaque pdfium failure.

use crate::error::PaperfigError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// A local PDF path, possibly backed by a temporary download.
pub enum ResolvedInput {
    /// Input was already a local file.
    Local(PathBuf),
    /// Input was a URL; the `TempDir` is removed on drop.
    Downloaded { path: PathBuf, _temp_dir: TempDir },
}

impl ResolvedInput {
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Downloaded { path, .. } => path,
        }
    }
}

/// `true` for `http://` and `https://` inputs.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve `input` to a local PDF, downloading it first when it is a URL.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, PaperfigError> {
    if input.trim().is_empty() {
        return Err(PaperfigError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(Path::new(input))
    }
}

/// Validate a local path: it exists, is readable and starts with `%PDF`.
pub fn resolve_local(path: &Path) -> Result<ResolvedInput, PaperfigError> {
    let path = path.to_path_buf();
    if !path.exists() {
        return Err(PaperfigError::FileNotFound { path });
    }

    let mut file = match std::fs::File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(PaperfigError::PermissionDenied { path });
        }
        Err(_) => return Err(PaperfigError::FileNotFound { path }),
    };

    let mut head = [0u8; 4];
    if file.read_exact(&mut head).is_ok() {
        check_pdf_magic(&head, &path)?;
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(ResolvedInput::Local(path))
}

/// Fail with [`PaperfigError::NotAPdf`] unless `bytes` starts with `%PDF`.
///
/// Inputs shorter than four bytes are left for the PDF parser to reject.
pub fn check_pdf_magic(bytes: &[u8], origin: &Path) -> Result<(), PaperfigError> {
    match bytes.get(..4) {
        Some(head) if head != PDF_MAGIC => {
            let mut magic = [0u8; 4];
            magic.copy_from_slice(head);
            Err(PaperfigError::NotAPdf {
                path: origin.to_path_buf(),
                magic,
            })
        }
        _ => Ok(()),
    }
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, PaperfigError> {
    info!("Downloading PDF from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| PaperfigError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let timeout_or_failure = |e: reqwest::Error| {
        if e.is_timeout() {
            PaperfigError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            PaperfigError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    };

    let response = client.get(url).send().await.map_err(timeout_or_failure)?;
    if !response.status().is_success() {
        return Err(PaperfigError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let temp_dir = TempDir::new().map_err(|e| PaperfigError::Internal(e.to_string()))?;
    let file_path = temp_dir.path().join(filename_from_url(url));

    let bytes = response.bytes().await.map_err(timeout_or_failure)?;
    check_pdf_magic(&bytes, &file_path)?;

    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| PaperfigError::OutputWriteFailed {
            path: file_path.clone(),
            source: e,
        })?;

    info!("Downloaded {} bytes to: {}", bytes.len(), file_path.display());
    Ok(ResolvedInput::Downloaded {
        path: file_path,
        _temp_dir: temp_dir,
    })
}

/// Last path segment of `url` when it looks like a file name.
///
/// arXiv serves `/pdf/2401.01234` without an extension, so `.pdf` is added
/// when missing.
fn filename_from_url(url: &str) -> String {
    let last = reqwest::Url::parse(url).ok().and_then(|parsed| {
        parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back().map(str::to_string))
    });
    match last {
        Some(name) if name.ends_with(".pdf") => name,
        Some(name) if !name.is_empty() => format!("{name}.pdf"),
        _ => "downloaded.pdf".to_string(),
    }
}
