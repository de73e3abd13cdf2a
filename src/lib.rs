//! Retrieval core for answering natural-language questions about a
//! software repository.
//!
//! The crate covers four tightly coupled subsystems:
//! - code-aware chunking of source files, Markdown, and PDF into fragments
//!   with structural metadata ([`splitter`], [`loader`], [`ingestion`])
//! - hybrid search fusing dense-vector and lexical retrieval with metadata
//!   filtering and score normalization ([`hybrid_search`],
//!   [`keyword_search`], [`storage`])
//! - PII redaction with reversible placeholder mapping ([`pii`])
//! - LLM-as-judge evaluation of retrieval + generation quality
//!   ([`evaluation`])
//!
//! The embedding model, vector database, full-text index, and generator
//! are external collaborators behind the traits in [`storage`] and
//! [`generator`].

pub mod api;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod fragment;
pub mod generator;
pub mod hybrid_search;
pub mod ingestion;
pub mod keyword_search;
pub mod loader;
pub mod logging;
pub mod pii;
pub mod rag;
pub mod security_scan;
pub mod splitter;
pub mod storage;
pub mod vector_store_schema;

pub use crate::config::{ChunkConfig, GeneratorConfig, HybridConfig, RagConfig, VectorConfig};
pub use crate::error::{RagError, Result};
pub use crate::evaluation::{EvaluationResult, RagEvaluator};
pub use crate::fragment::{content_hash, Fragment, Metadata};
pub use crate::generator::{ChatGenerator, GeneratorError, OllamaGenerator};
pub use crate::hybrid_search::{HybridSearchService, MetadataFilter};
pub use crate::ingestion::{IngestionService, SUPPORTED_EXTENSIONS};
pub use crate::keyword_search::KeywordSearchService;
pub use crate::loader::LoadedDocument;
pub use crate::logging::{initialize_logging, LoggingConfig};
pub use crate::pii::{MaskingResult, PiiDetector};
pub use crate::rag::{
    ChatRequest, ChatResponse, RagService, ResponseMetadata, SourceDocument,
};
pub use crate::security_scan::{CodeSecurityScanner, ScanResult, SecurityIssue};
pub use crate::splitter::{JavaSplitter, MarkdownSplitter, Splitter, TokenSplitter};
pub use crate::storage::{
    Embedder, HashEmbedder, KeywordIndex, MemoryKeywordIndex, MemoryVectorStore, ScoredFragment,
    StorageError, VectorStore,
};
