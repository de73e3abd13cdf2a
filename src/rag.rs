//! RAG orchestration: redaction, hybrid retrieval, context assembly,
//! generation, citation binding.
//!
//! The pipeline never fails outward. Empty retrieval produces the canonical
//! no-results response; a generator failure or timeout degrades to the
//! canonical error answer with the retrieved sources still attached.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::RagConfig;
use crate::fragment::Fragment;
use crate::generator::ChatGenerator;
use crate::hybrid_search::{HybridSearchService, MetadataFilter};
use crate::pii::PiiDetector;

pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.7;

/// Canonical answer when retrieval comes back empty.
pub const NO_RESULTS_ANSWER: &str = "I couldn't find any relevant information in the codebase \
to answer your question. Please try rephrasing your query or check if the documents have \
been ingested.";

/// Canonical answer when the generator fails or times out.
pub const GENERATION_ERROR_ANSWER: &str =
    "Sorry, I encountered an error generating the answer. Please try again.";

const SYSTEM_PROMPT: &str = r#"You are a helpful code assistant with deep knowledge of software engineering.
Answer the user's question based ONLY on the provided code context.

Guidelines:
- Be concise and technical
- ALWAYS cite sources using [1], [2], etc. when referencing specific information
- Cite specific file names, class names, and method names when available
- If the context doesn't contain enough information, say so
- Use code examples from the context when helpful
- Format code blocks with proper syntax highlighting
- Place citations immediately after the relevant statement

Example: "The UserService class handles authentication [1] using JWT tokens [2]."
"#;

const CONTEXT_DELIMITER: &str = "\n---\n";
const SNIPPET_MAX_CHARS: usize = 200;

/// Chat request: query plus retrieval parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub query: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<MetadataFilter>,
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

fn default_similarity_threshold() -> f32 {
    DEFAULT_SIMILARITY_THRESHOLD
}

impl ChatRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            top_k: DEFAULT_TOP_K,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            filters: None,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold;
        self
    }
}

/// A cited source in the response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceDocument {
    /// 1-based, in result order; matches the `[n]` citations the generator
    /// is instructed to produce.
    pub citation_number: usize,
    pub source: String,
    pub filename: String,
    /// Content snippet, truncated to 200 characters with an ellipsis.
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
    /// Remaining metadata flattened to `key=value` pairs.
    pub metadata: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_range: Option<String>,
    pub class_name: String,
    pub method_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    pub documents_retrieved: usize,
    pub processing_time_ms: u64,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub answer: String,
    pub sources: Vec<SourceDocument>,
    pub metadata: ResponseMetadata,
}

/// The orchestrator.
pub struct RagService {
    hybrid_search: Arc<HybridSearchService>,
    generator: Arc<dyn ChatGenerator>,
    pii_detector: PiiDetector,
    config: Arc<RagConfig>,
}

impl RagService {
    pub fn new(
        hybrid_search: Arc<HybridSearchService>,
        generator: Arc<dyn ChatGenerator>,
        config: Arc<RagConfig>,
    ) -> Self {
        Self {
            hybrid_search,
            generator,
            pii_detector: PiiDetector::new(),
            config,
        }
    }

    /// Process a chat query through the full pipeline.
    pub async fn chat(&self, request: ChatRequest) -> ChatResponse {
        let start = Instant::now();
        let request_id = Uuid::new_v4();
        info!(%request_id, top_k = request.top_k, "Processing RAG query");

        // 1. Redact PII before the query leaves the boundary. The mapping
        // stays request-scoped; outbound responses never restore it.
        let masking = self.pii_detector.mask(&request.query);
        if !masking.mappings.is_empty() {
            info!(
                %request_id,
                instances = masking.mappings.len(),
                "Masked PII in query"
            );
        }

        // 2. Hybrid retrieval on the masked query.
        let results = self
            .hybrid_search
            .search(
                &masking.masked_text,
                request.top_k,
                request.similarity_threshold,
                request.filters.as_ref(),
            )
            .await;

        if results.is_empty() {
            warn!(%request_id, "No relevant documents found");
            return self.no_results_response(start);
        }
        info!(%request_id, documents = results.len(), "Retrieved documents");

        // 3. Context assembly.
        let context = build_context(&results);

        // 4. Generation, degrading to the canonical error answer.
        let answer = self.generate_answer(&masking.masked_text, &context).await;

        // 5. Citation binding.
        self.build_response(answer, &results, start)
    }

    async fn generate_answer(&self, query: &str, context: &str) -> String {
        let user_prompt = format!(
            "Context from codebase:\n{}\n\nQuestion: {}\n\nAnswer:\n",
            context, query
        );

        let timeout = Duration::from_millis(self.config.generator.timeout_ms);
        match tokio::time::timeout(
            timeout,
            self.generator.generate(Some(SYSTEM_PROMPT), &user_prompt),
        )
        .await
        {
            Ok(Ok(answer)) => answer,
            Ok(Err(e)) => {
                error!(error = %e, "Generator call failed");
                GENERATION_ERROR_ANSWER.to_string()
            }
            Err(_) => {
                error!(timeout_ms = timeout.as_millis() as u64, "Generator call timed out");
                GENERATION_ERROR_ANSWER.to_string()
            }
        }
    }

    fn build_response(
        &self,
        answer: String,
        results: &[Fragment],
        start: Instant,
    ) -> ChatResponse {
        let sources = results
            .iter()
            .enumerate()
            .map(|(i, fragment)| {
                let metadata = &fragment.metadata;
                SourceDocument {
                    citation_number: i + 1,
                    source: or_unknown(metadata.source()),
                    filename: or_unknown(metadata.filename()),
                    content: truncate(&fragment.content, SNIPPET_MAX_CHARS),
                    score: metadata.hybrid_score(),
                    metadata: metadata.display_string(),
                    line_range: metadata.line_range(),
                    class_name: metadata.class_name().to_string(),
                    method_name: metadata.method_name().to_string(),
                }
            })
            .collect();

        ChatResponse {
            answer,
            sources,
            metadata: ResponseMetadata {
                documents_retrieved: results.len(),
                processing_time_ms: start.elapsed().as_millis() as u64,
                model: self.generator.model_label(),
            },
        }
    }

    fn no_results_response(&self, start: Instant) -> ChatResponse {
        ChatResponse {
            answer: NO_RESULTS_ANSWER.to_string(),
            sources: Vec::new(),
            metadata: ResponseMetadata {
                documents_retrieved: 0,
                processing_time_ms: start.elapsed().as_millis() as u64,
                model: self.generator.model_label(),
            },
        }
    }
}

/// Concatenate source/file headers and content, one block per fragment,
/// joined by a fixed delimiter line.
fn build_context(results: &[Fragment]) -> String {
    results
        .iter()
        .map(|fragment| {
            format!(
                "[Source: {}]\n[File: {}]\n{}\n",
                or_unknown(fragment.metadata.source()),
                or_unknown(fragment.metadata.filename()),
                fragment.content
            )
        })
        .collect::<Vec<_>>()
        .join(CONTEXT_DELIMITER)
}

fn or_unknown(value: &str) -> String {
    if value.is_empty() {
        "unknown".to_string()
    } else {
        value.to_string()
    }
}

/// Truncate on a character boundary, appending an ellipsis when cut.
fn truncate(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        return content.to_string();
    }
    let cut: String = content.chars().take(max_chars).collect();
    format!("{}...", cut)
}
