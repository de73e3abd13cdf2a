//! Storage capability traits and in-memory reference backends.
//!
//! The production vector database and full-text index are external
//! collaborators; the core talks to them through the narrow [`VectorStore`]
//! and [`KeywordIndex`] traits. The in-memory implementations here back the
//! test suite and the demo binary: a cosine-scan vector store over a
//! deterministic hashing embedder, and a BM25-scored keyword index with an
//! English stopword list.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

use crate::fragment::Fragment;

/// Storage-related errors.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// A fragment paired with the backend's raw relevance score.
#[derive(Debug, Clone)]
pub struct ScoredFragment {
    pub fragment: Fragment,
    pub score: f32,
}

/// Produces fixed-dimension embedding vectors for text.
pub trait Embedder: Send + Sync {
    fn dimensions(&self) -> usize;
    fn embed(&self, text: &str) -> Vec<f32>;
}

/// Vector store capability: commits embed transparently; search is the
/// store's ANN facility with a similarity floor.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Embed and persist fragments. Re-adding a fragment with the same
    /// identity (`source` + content hash) replaces the stored copy, so
    /// re-ingesting an unchanged file is idempotent. Returns the number of
    /// fragments committed.
    async fn add(&self, fragments: Vec<Fragment>) -> Result<usize, StorageError>;

    /// Fragments ordered by decreasing cosine similarity to the query,
    /// subject to `similarity >= threshold`, at most `top_k`.
    async fn similarity_search(
        &self,
        query: &str,
        top_k: usize,
        threshold: f32,
    ) -> Result<Vec<Fragment>, StorageError>;
}

/// Full-text index capability: BM25-like scoring, raw scores, only
/// token-matching fragments returned.
#[async_trait]
pub trait KeywordIndex: Send + Sync {
    async fn add(&self, fragments: &[Fragment]) -> Result<(), StorageError>;

    async fn search(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<ScoredFragment>, StorageError>;
}

// ---------------------------------------------------------------------------
// Deterministic hashing embedder
// ---------------------------------------------------------------------------

/// Token-hashing embedder: each token hashes into a dimension bucket, the
/// resulting histogram is L2-normalized. Deterministic, no model download,
/// no network. Similar token sets land near each other, which is all the
/// reference store and the tests need.
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

impl Embedder for HashEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for token in tokenize(text) {
            let digest = Sha256::digest(token.as_bytes());
            let bucket = u64::from_be_bytes([
                digest[0], digest[1], digest[2], digest[3], digest[4], digest[5], digest[6],
                digest[7],
            ]) as usize
                % self.dimensions;
            vector[bucket] += 1.0;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

// ---------------------------------------------------------------------------
// In-memory vector store
// ---------------------------------------------------------------------------

struct StoredPoint {
    fragment: Fragment,
    embedding: Vec<f32>,
}

/// Reference vector store: exhaustive cosine scan over in-memory points.
pub struct MemoryVectorStore {
    embedder: Arc<dyn Embedder>,
    points: RwLock<Vec<StoredPoint>>,
}

impl MemoryVectorStore {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            points: RwLock::new(Vec::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.points.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.points.read().await.is_empty()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn add(&self, fragments: Vec<Fragment>) -> Result<usize, StorageError> {
        let mut points = self.points.write().await;
        let count = fragments.len();

        for mut fragment in fragments {
            let embedding = self.embedder.embed(&fragment.content);
            if embedding.len() != self.embedder.dimensions() {
                return Err(StorageError::DimensionMismatch {
                    expected: self.embedder.dimensions(),
                    actual: embedding.len(),
                });
            }
            fragment.embedding = Some(embedding.clone());

            let identity = fragment.identity();
            // Stable upsert keyed on source + content hash.
            if let Some(existing) = points
                .iter_mut()
                .find(|p| p.fragment.identity() == identity)
            {
                existing.fragment = fragment;
                existing.embedding = embedding;
            } else {
                points.push(StoredPoint {
                    fragment,
                    embedding,
                });
            }
        }

        debug!(added = count, total = points.len(), "Committed fragments to vector store");
        Ok(count)
    }

    async fn similarity_search(
        &self,
        query: &str,
        top_k: usize,
        threshold: f32,
    ) -> Result<Vec<Fragment>, StorageError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query);
        let points = self.points.read().await;

        let mut scored: Vec<(f32, &StoredPoint)> = points
            .iter()
            .map(|point| (cosine_similarity(&query_embedding, &point.embedding), point))
            .filter(|(similarity, _)| *similarity >= threshold)
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(_, point)| point.fragment.clone())
            .collect())
    }
}

/// Cosine similarity of two equal-length vectors; 0 for degenerate input.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

// ---------------------------------------------------------------------------
// In-memory keyword index
// ---------------------------------------------------------------------------

const BM25_K1: f32 = 1.2;
const BM25_B: f32 = 0.75;

/// Minimal English stopword list, mirroring what the production analyzer
/// drops before indexing.
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is",
    "it", "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there",
    "these", "they", "this", "to", "was", "will", "with",
];

fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(&token)
}

/// Lowercased alphanumeric tokens, stopwords removed.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .filter(|t| !is_stopword(t))
        .collect()
}

struct IndexedDocument {
    fragment: Fragment,
    term_frequencies: HashMap<String, u32>,
    length: usize,
}

/// Reference keyword index: classic BM25 over in-memory postings.
pub struct MemoryKeywordIndex {
    documents: RwLock<Vec<IndexedDocument>>,
}

impl MemoryKeywordIndex {
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(Vec::new()),
        }
    }
}

impl Default for MemoryKeywordIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeywordIndex for MemoryKeywordIndex {
    async fn add(&self, fragments: &[Fragment]) -> Result<(), StorageError> {
        let mut documents = self.documents.write().await;
        for fragment in fragments {
            let tokens = tokenize(&fragment.content);
            let mut term_frequencies: HashMap<String, u32> = HashMap::new();
            for token in &tokens {
                *term_frequencies.entry(token.clone()).or_insert(0) += 1;
            }

            let identity = fragment.identity();
            let indexed = IndexedDocument {
                fragment: fragment.clone(),
                length: tokens.len(),
                term_frequencies,
            };
            if let Some(existing) = documents
                .iter_mut()
                .find(|d| d.fragment.identity() == identity)
            {
                *existing = indexed;
            } else {
                documents.push(indexed);
            }
        }
        Ok(())
    }

    async fn search(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<ScoredFragment>, StorageError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let query_tokens = tokenize(query);
        if query_tokens.is_empty() {
            return Ok(Vec::new());
        }

        let documents = self.documents.read().await;
        let doc_count = documents.len();
        if doc_count == 0 {
            return Ok(Vec::new());
        }

        let avg_length: f32 = documents.iter().map(|d| d.length as f32).sum::<f32>()
            / doc_count as f32;

        // Document frequency per query term.
        let mut doc_frequencies: HashMap<&str, usize> = HashMap::new();
        for token in &query_tokens {
            let df = documents
                .iter()
                .filter(|d| d.term_frequencies.contains_key(token.as_str()))
                .count();
            doc_frequencies.insert(token.as_str(), df);
        }

        let mut results: Vec<ScoredFragment> = documents
            .iter()
            .filter_map(|doc| {
                let mut score = 0.0f32;
                let mut matched = false;
                for token in &query_tokens {
                    let tf = *doc.term_frequencies.get(token.as_str()).unwrap_or(&0) as f32;
                    if tf == 0.0 {
                        continue;
                    }
                    matched = true;
                    let df = doc_frequencies[token.as_str()] as f32;
                    let idf = (1.0 + (doc_count as f32 - df + 0.5) / (df + 0.5)).ln();
                    let norm = 1.0 - BM25_B + BM25_B * (doc.length as f32 / avg_length.max(1.0));
                    score += idf * (tf * (BM25_K1 + 1.0)) / (tf + BM25_K1 * norm);
                }
                // Only fragments matching at least one query token return.
                matched.then(|| ScoredFragment {
                    fragment: doc.fragment.clone(),
                    score,
                })
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(top_k);
        Ok(results)
    }
}
