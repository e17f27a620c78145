//! PDF document loading via `lopdf`.
use std::path::{Path, PathBuf};

use lopdf::Document;
use thiserror::Error;
use tracing::{info, warn};

/// Errors that can occur while loading the source document.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("document not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to parse PDF {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: lopdf::Error,
    },
}

/// Text extracted from one physical page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// 1-based page index.
    pub number: u32,
    /// Extracted text; empty for image-only pages.
    pub text: String,
}

impl Page {
    pub fn new(number: u32, text: impl Into<String>) -> Self {
        Self {
            number,
            text: text.into(),
        }
    }

    /// Whether the page carries any non-whitespace text.
    #[must_use]
    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// Reads a PDF and returns one [`Page`] per physical page, in page order.
pub fn load_pdf<P: AsRef<Path>>(path: P) -> Result<Vec<Page>, LoadError> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }

    let doc = Document::load(path).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    // get_pages is a BTreeMap keyed by page number, so iteration is ordered
    let mut pages = Vec::new();
    for &number in doc.get_pages().keys() {
        let text = match doc.extract_text(&[number]) {
            Ok(text) => text.trim_end().to_string(),
            Err(e) => {
                warn!("No extractable text on page {number}: {e}");
                String::new()
            }
        };
        pages.push(Page { number, text });
    }

    info!("Loaded {} pages from {}", pages.len(), path.display());
    Ok(pages)
}
