//! Document ingestion: walk a path, chunk each supported file, commit the
//! fragments to the backing stores.
//!
//! Partial-failure policy: one file failing to load or split is logged and
//! skipped; only an unreadable walk root fails the whole run.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::config::RagConfig;
use crate::error::RagError;
use crate::fragment::Fragment;
use crate::loader;
use crate::splitter::Splitter;
use crate::storage::{KeywordIndex, VectorStore};

/// File extensions the ingestor accepts.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "java", "md", "txt", "pdf", "yaml", "yml", "gradle", "properties",
];

pub fn is_supported(path: &Path) -> bool {
    let extension = loader::file_extension(path);
    SUPPORTED_EXTENSIONS.contains(&extension.as_str())
}

pub struct IngestionService {
    vector_store: Arc<dyn VectorStore>,
    keyword_index: Arc<dyn KeywordIndex>,
    config: Arc<RagConfig>,
}

impl IngestionService {
    pub fn new(
        vector_store: Arc<dyn VectorStore>,
        keyword_index: Arc<dyn KeywordIndex>,
        config: Arc<RagConfig>,
    ) -> Self {
        Self {
            vector_store,
            keyword_index,
            config,
        }
    }

    /// Ingest every supported file under `start_path` (recursively, in walk
    /// order). Returns the number of fragments committed.
    pub async fn ingest(&self, start_path: &Path) -> Result<usize, RagError> {
        if !start_path.exists() {
            return Err(RagError::Ingestion {
                message: "path does not exist".to_string(),
                path: start_path.display().to_string(),
            });
        }

        let mut all_fragments: Vec<Fragment> = Vec::new();
        let mut files_processed = 0usize;
        let mut files_failed = 0usize;

        for entry in WalkDir::new(start_path) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    // A failure on the root itself aborts; anything deeper
                    // is skipped like any other per-file failure.
                    if e.path() == Some(start_path) || e.depth() == 0 {
                        return Err(RagError::Ingestion {
                            message: e.to_string(),
                            path: start_path.display().to_string(),
                        });
                    }
                    warn!(error = %e, "Skipping unreadable directory entry");
                    files_failed += 1;
                    continue;
                }
            };

            if !entry.file_type().is_file() || !is_supported(entry.path()) {
                continue;
            }

            match self.process_file(entry.path()) {
                Ok(fragments) => {
                    info!(
                        file = %entry.path().display(),
                        chunks = fragments.len(),
                        "Processed file"
                    );
                    all_fragments.extend(fragments);
                    files_processed += 1;
                }
                Err(e) => {
                    error!(file = %entry.path().display(), error = %e, "Failed to process file, skipping");
                    files_failed += 1;
                }
            }
        }

        if all_fragments.is_empty() {
            warn!(path = %start_path.display(), "No documents found to ingest");
            return Ok(0);
        }

        let total = all_fragments.len();
        info!(fragments = total, "Storing fragments to vector store");
        self.vector_store.add(all_fragments.clone()).await?;
        // Deployments where the lexical index is fed by the persistence
        // layer's insert trigger make this a no-op.
        self.keyword_index.add(&all_fragments).await?;

        info!(
            files = files_processed,
            failed = files_failed,
            fragments = total,
            "Ingestion completed"
        );
        Ok(total)
    }

    /// Load one file and split it into fragments. PDF pages are fragments
    /// already; everything else goes through the type-matched splitter.
    fn process_file(&self, path: &Path) -> Result<Vec<Fragment>, RagError> {
        let extension = loader::file_extension(path);
        if extension == "pdf" {
            return loader::load_pdf(path);
        }

        let document = loader::load_text(path)?;
        if document.content.is_empty() {
            debug!(file = %path.display(), "Empty file, no fragments");
            return Ok(Vec::new());
        }

        let splitter = Splitter::for_file_type(&extension, &self.config.chunk);
        Ok(splitter.split(&document.content, &document.metadata))
    }
}
