//! Configuration for the retrieval core.
//!
//! All values are read once at startup, validated, and handed to
//! constructors as a read-only snapshot (`Arc<RagConfig>`). Nothing in the
//! pipeline mutates configuration after initialization.

use serde::{Deserialize, Serialize};

use crate::error::RagError;

/// Hybrid fusion parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HybridConfig {
    /// Weight for the semantic side of the fusion; the lexical side gets
    /// `1 - alpha`. Must lie in `[0, 1]`.
    pub alpha: f32,
    /// Each backend over-retrieves `top_k * retrieval_multiplier` results
    /// so fusion has headroom to promote items mid-ranked by one backend
    /// but high in the other. Must be >= 1.
    pub retrieval_multiplier: usize,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            alpha: 0.7,
            retrieval_multiplier: 2,
        }
    }
}

/// Per-splitter token budgets. Budgets are approximate: the splitters use a
/// character-based estimator (1 token ~= 4 chars).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkConfig {
    pub java_max_tokens: usize,
    pub markdown_max_tokens: usize,
    pub generic_max_tokens: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            java_max_tokens: 1500,
            markdown_max_tokens: 1000,
            generic_max_tokens: 512,
        }
    }
}

/// Vector store parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorConfig {
    /// Embedding dimension. Must match the embedding model.
    pub dimensions: usize,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self { dimensions: 768 }
    }
}

/// Generator (chat model) connection parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Base URL of the Ollama-compatible chat endpoint.
    pub base_url: String,
    /// Model name passed on every request.
    pub model: String,
    /// Per-call timeout in milliseconds. On timeout the orchestrator
    /// degrades to the canonical error answer.
    pub timeout_ms: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.1".to_string(),
            timeout_ms: 60_000,
        }
    }
}

/// Complete retrieval-core configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    pub hybrid: HybridConfig,
    pub chunk: ChunkConfig,
    pub vector: VectorConfig,
    pub generator: GeneratorConfig,
    /// Timeout applied to each individual backend call (semantic or
    /// lexical). A timed-out backend contributes an empty result set and
    /// does not fail the request.
    pub backend_timeout_ms: u64,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            hybrid: HybridConfig::default(),
            chunk: ChunkConfig::default(),
            vector: VectorConfig::default(),
            generator: GeneratorConfig::default(),
            backend_timeout_ms: 10_000,
        }
    }
}

impl RagConfig {
    /// Validate value ranges. Called once at startup.
    pub fn validate(&self) -> Result<(), RagError> {
        if !(0.0..=1.0).contains(&self.hybrid.alpha) {
            return Err(RagError::configuration(format!(
                "hybrid.alpha must be in [0, 1], got {}",
                self.hybrid.alpha
            )));
        }
        if self.hybrid.retrieval_multiplier < 1 {
            return Err(RagError::configuration(
                "hybrid.retrieval_multiplier must be >= 1",
            ));
        }
        if self.vector.dimensions == 0 {
            return Err(RagError::configuration("vector.dimensions must be > 0"));
        }
        if self.chunk.java_max_tokens == 0
            || self.chunk.markdown_max_tokens == 0
            || self.chunk.generic_max_tokens == 0
        {
            return Err(RagError::configuration("chunk token budgets must be > 0"));
        }
        Ok(())
    }
}
