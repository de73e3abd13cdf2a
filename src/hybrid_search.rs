//! Hybrid search: deterministic fusion of semantic and lexical retrieval.
//!
//! Algorithm:
//! 1. Over-retrieve from both backends (`top_k * retrieval_multiplier`),
//!    concurrently.
//! 2. Apply metadata filters to both result lists independently.
//! 3. Normalize: rank-based on the semantic side (ANN distances are not
//!    comparable across queries; rank preserves relative order), max-based
//!    on the lexical side (BM25 ratios are meaningful within one query).
//! 4. Merge on fragment identity (`source` + content hash).
//! 5. Convex combination: `alpha * semantic + (1 - alpha) * keyword`; a
//!    fragment seen by only one backend scores 0 on the other side, which
//!    biases toward items both backends agree on.
//! 6. Rank by combined score, break ties by lexical score then source,
//!    truncate to `top_k`, attach transient score metadata.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::RagConfig;
use crate::fragment::{Fragment, Metadata};
use crate::keyword_search::KeywordSearchService;
use crate::storage::{ScoredFragment, VectorStore};

/// Intersection (logical AND) of optional predicates over reserved
/// metadata keys. Absent or blank predicates are vacuously true.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetadataFilter {
    /// Case-insensitive equality on `file_type`.
    pub file_type: Option<String>,
    /// Substring match on `source`.
    pub source_path: Option<String>,
    /// Case-insensitive equality on `class_name`.
    pub class_name: Option<String>,
    /// Case-insensitive equality on `method_name`.
    pub method_name: Option<String>,
    /// Substring match on `filename`.
    pub filename: Option<String>,
}

impl MetadataFilter {
    /// True when the fragment satisfies every present predicate. Missing
    /// metadata fields read as empty strings: they fail equality predicates
    /// and pass substring predicates only for blank filter values.
    pub fn matches(&self, metadata: &Metadata) -> bool {
        matches_equality_ci(metadata.file_type(), &self.file_type)
            && matches_substring(metadata.source(), &self.source_path)
            && matches_equality_ci(metadata.class_name(), &self.class_name)
            && matches_equality_ci(metadata.method_name(), &self.method_name)
            && matches_substring(metadata.filename(), &self.filename)
    }

    pub fn is_empty(&self) -> bool {
        fn blank(v: &Option<String>) -> bool {
            v.as_deref().map_or(true, |s| s.trim().is_empty())
        }
        blank(&self.file_type)
            && blank(&self.source_path)
            && blank(&self.class_name)
            && blank(&self.method_name)
            && blank(&self.filename)
    }
}

fn matches_equality_ci(actual: &str, expected: &Option<String>) -> bool {
    match expected.as_deref() {
        None => true,
        Some(value) if value.trim().is_empty() => true,
        Some(value) => actual.eq_ignore_ascii_case(value),
    }
}

fn matches_substring(actual: &str, expected: &Option<String>) -> bool {
    match expected.as_deref() {
        None => true,
        Some(value) if value.trim().is_empty() => true,
        Some(value) => actual.contains(value),
    }
}

/// A fragment with its fused and per-backend normalized scores.
struct ScoredDocument {
    fragment: Fragment,
    combined_score: f32,
    semantic_score: f32,
    keyword_score: f32,
}

/// Hybrid search over a vector store and a keyword index.
pub struct HybridSearchService {
    vector_store: Arc<dyn VectorStore>,
    keyword_search: KeywordSearchService,
    config: Arc<RagConfig>,
}

impl HybridSearchService {
    pub fn new(
        vector_store: Arc<dyn VectorStore>,
        keyword_search: KeywordSearchService,
        config: Arc<RagConfig>,
    ) -> Self {
        Self {
            vector_store,
            keyword_search,
            config,
        }
    }

    /// Run the full fusion pipeline. Never fails: backend outages degrade
    /// to the surviving side, and an empty corpus yields an empty result.
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
        similarity_threshold: f32,
        filters: Option<&MetadataFilter>,
    ) -> Vec<Fragment> {
        if top_k == 0 {
            return Vec::new();
        }

        let alpha = self.config.hybrid.alpha;
        info!(
            top_k,
            alpha,
            filtered = filters.map_or(false, |f| !f.is_empty()),
            "Hybrid search started"
        );

        // 1. Over-retrieval, both backends concurrently.
        let retrieval_size = top_k.saturating_mul(self.config.hybrid.retrieval_multiplier);
        let (semantic, keyword) = tokio::join!(
            self.semantic_search(query, retrieval_size, similarity_threshold),
            self.keyword_search.search(query, retrieval_size),
        );
        let (semantic_count, keyword_count) = (semantic.len(), keyword.len());

        // 2. Filters, each list independently.
        let (semantic, keyword) = apply_filters(semantic, keyword, filters);

        // 3-5. Normalize and merge.
        let merged = merge_and_score(semantic, keyword, alpha);

        // 6. Rank, truncate, attach transient scores.
        let results = rank_and_limit(merged, top_k);

        info!(
            results = results.len(),
            semantic = semantic_count,
            keyword = keyword_count,
            "Hybrid search completed"
        );
        results
    }

    /// Semantic side with the per-call timeout; errors and timeouts
    /// degrade to empty so the lexical side still answers.
    async fn semantic_search(
        &self,
        query: &str,
        top_k: usize,
        threshold: f32,
    ) -> Vec<Fragment> {
        let timeout = Duration::from_millis(self.config.backend_timeout_ms);
        match tokio::time::timeout(
            timeout,
            self.vector_store.similarity_search(query, top_k, threshold),
        )
        .await
        {
            Ok(Ok(results)) => {
                debug!(results = results.len(), "Semantic search completed");
                results
            }
            Ok(Err(e)) => {
                error!(error = %e, "Semantic search failed");
                Vec::new()
            }
            Err(_) => {
                warn!(timeout_ms = timeout.as_millis() as u64, "Semantic search timed out");
                Vec::new()
            }
        }
    }
}

fn apply_filters(
    semantic: Vec<Fragment>,
    keyword: Vec<ScoredFragment>,
    filters: Option<&MetadataFilter>,
) -> (Vec<Fragment>, Vec<ScoredFragment>) {
    let Some(filter) = filters else {
        return (semantic, keyword);
    };

    let semantic = semantic
        .into_iter()
        .filter(|fragment| filter.matches(&fragment.metadata))
        .collect();
    let keyword = keyword
        .into_iter()
        .filter(|scored| filter.matches(&scored.fragment.metadata))
        .collect();
    (semantic, keyword)
}

/// Steps 3-5: normalization, identity merge, convex combination.
fn merge_and_score(
    semantic: Vec<Fragment>,
    keyword: Vec<ScoredFragment>,
    alpha: f32,
) -> Vec<ScoredDocument> {
    let mut combined: HashMap<String, ScoredDocument> = HashMap::new();

    // Rank-based normalization: the item at 0-based rank r of a list of
    // length L scores 1 - r/L, L clamped to >= 1.
    let semantic_len = semantic.len().max(1) as f32;
    for (rank, fragment) in semantic.into_iter().enumerate() {
        let normalized = 1.0 - (rank as f32 / semantic_len);
        let identity = fragment.identity();
        combined.insert(
            identity,
            ScoredDocument {
                fragment,
                combined_score: alpha * normalized,
                semantic_score: normalized,
                keyword_score: 0.0,
            },
        );
    }

    // Max-based normalization on the lexical side.
    if !keyword.is_empty() {
        let max_score = keyword
            .iter()
            .map(|scored| scored.score)
            .fold(f32::MIN, f32::max)
            .max(f32::MIN_POSITIVE);

        for scored in keyword {
            let normalized = scored.score / max_score;
            let weighted = (1.0 - alpha) * normalized;
            let identity = scored.fragment.identity();

            combined
                .entry(identity)
                .and_modify(|existing| {
                    // Present in both backends: scores add.
                    existing.combined_score += weighted;
                    existing.keyword_score = normalized;
                })
                .or_insert(ScoredDocument {
                    fragment: scored.fragment,
                    combined_score: weighted,
                    semantic_score: 0.0,
                    keyword_score: normalized,
                });
        }
    }

    combined.into_values().collect()
}

/// Step 6: stable descending order with documented tie-breaks, truncation,
/// transient score attachment.
fn rank_and_limit(mut scored: Vec<ScoredDocument>, top_k: usize) -> Vec<Fragment> {
    scored.sort_by(|a, b| {
        b.combined_score
            .partial_cmp(&a.combined_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                b.keyword_score
                    .partial_cmp(&a.keyword_score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.fragment.metadata.source().cmp(b.fragment.metadata.source()))
    });
    scored.truncate(top_k);

    scored
        .into_iter()
        .map(|doc| {
            let mut fragment = doc.fragment;
            fragment.metadata.set_scores(
                doc.combined_score,
                doc.semantic_score,
                doc.keyword_score,
            );
            fragment
        })
        .collect()
}
