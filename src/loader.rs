//! Document loading.
//!
//! Text-based files load into a single [`LoadedDocument`] carrying identity
//! metadata (source path, filename, file type). PDF files load straight
//! into fragments, one per page, before any further chunking.

use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::RagError;
use crate::fragment::{Fragment, Metadata};

/// A loaded text document, ready for splitting.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub content: String,
    pub metadata: Metadata,
}

/// Identity metadata shared by every fragment of a file.
pub fn base_metadata(path: &Path) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.set_source(path.to_string_lossy().to_string());
    metadata.set_filename(
        path.file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "unknown".to_string()),
    );
    metadata.set_file_type(file_extension(path));
    metadata
}

/// Lowercased file extension, `"unknown"` when absent.
pub fn file_extension(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Load a text-based file. Falls back to lossy UTF-8 decoding for files
/// with stray invalid bytes rather than skipping them.
pub fn load_text(path: &Path) -> Result<LoadedDocument, RagError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(_) => {
            let bytes = fs::read(path).map_err(|e| RagError::DocumentLoad {
                message: e.to_string(),
                path: path.display().to_string(),
            })?;
            String::from_utf8_lossy(&bytes).into_owned()
        }
    };

    debug!(path = %path.display(), chars = content.len(), "Loaded text document");
    Ok(LoadedDocument {
        content,
        metadata: base_metadata(path),
    })
}

/// Load a PDF into fragments, one per page, `chunk_type = "pdf_page"`.
/// Blank pages are dropped. Extraction runs behind a panic guard: some
/// malformed font encodings panic inside the extraction library.
pub fn load_pdf(path: &Path) -> Result<Vec<Fragment>, RagError> {
    let path_buf = path.to_path_buf();
    let outcome =
        std::panic::catch_unwind(|| pdf_extract::extract_text_by_pages(&path_buf));

    let pages = match outcome {
        Ok(Ok(pages)) => pages,
        Ok(Err(e)) => {
            return Err(RagError::DocumentLoad {
                message: format!("PDF extraction failed: {}", e),
                path: path.display().to_string(),
            })
        }
        Err(_panic) => {
            return Err(RagError::DocumentLoad {
                message: "PDF parsing panicked (likely malformed font encoding)".to_string(),
                path: path.display().to_string(),
            })
        }
    };

    let base = base_metadata(path);
    let non_blank: Vec<(usize, String)> = pages
        .into_iter()
        .enumerate()
        .filter(|(_, text)| !text.trim().is_empty())
        .collect();

    let total = non_blank.len();
    let fragments: Vec<Fragment> = non_blank
        .into_iter()
        .enumerate()
        .map(|(index, (page_number, text))| {
            let mut metadata = base.clone();
            metadata.set_chunk_position(index, total);
            metadata.set_chunk_type("pdf_page");
            metadata.insert("page_number", serde_json::Value::from(page_number as u64 + 1));
            Fragment::new(text, metadata)
        })
        .collect();

    if fragments.is_empty() {
        warn!(path = %path.display(), "PDF produced no extractable text");
    } else {
        debug!(path = %path.display(), pages = fragments.len(), "Loaded PDF pages");
    }
    Ok(fragments)
}
