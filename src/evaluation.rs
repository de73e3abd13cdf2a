//! LLM-as-judge evaluation of the retrieval pipeline.
//!
//! Runs a query through the orchestrator, then asks the judge model to
//! score the answer's relevance to the query and its faithfulness to the
//! retrieved context, each on a 1-5 scale. A judge response that yields no
//! digit scores 0, as does faithfulness when there was no context to judge
//! against.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::generator::ChatGenerator;
use crate::rag::{ChatRequest, RagService};

/// Context passed to the faithfulness judge is capped at this many
/// characters to stay inside the judge's window.
const JUDGE_CONTEXT_MAX_CHARS: usize = 2000;

const EVALUATION_TOP_K: usize = 3;
const EVALUATION_SIMILARITY_THRESHOLD: f32 = 0.7;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    pub query: String,
    pub answer: String,
    /// `relevance` and `faithfulness`, each 0-5 (0 = not scored).
    pub scores: HashMap<String, i32>,
    pub reasoning: HashMap<String, String>,
    pub latency_ms: u64,
}

pub struct RagEvaluator {
    rag_service: Arc<RagService>,
    judge: Arc<dyn ChatGenerator>,
}

impl RagEvaluator {
    pub fn new(rag_service: Arc<RagService>, judge: Arc<dyn ChatGenerator>) -> Self {
        Self { rag_service, judge }
    }

    pub async fn evaluate(&self, query: &str) -> EvaluationResult {
        info!(query, "Starting evaluation");

        // 1. Run the RAG pipeline.
        let request = ChatRequest::new(query)
            .with_top_k(EVALUATION_TOP_K)
            .with_similarity_threshold(EVALUATION_SIMILARITY_THRESHOLD);
        let start = Instant::now();
        let response = self.rag_service.chat(request).await;
        let latency_ms = start.elapsed().as_millis() as u64;

        let answer = response.answer;
        let context = response
            .sources
            .iter()
            .map(|source| source.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        // 2. Relevance.
        let relevance = self.evaluate_relevance(query, &answer).await;

        // 3. Faithfulness, skipped without context.
        let faithfulness = if context.is_empty() {
            0
        } else {
            self.evaluate_faithfulness(&context, &answer).await
        };

        let mut scores = HashMap::new();
        scores.insert("relevance".to_string(), relevance);
        scores.insert("faithfulness".to_string(), faithfulness);

        let mut reasoning = HashMap::new();
        reasoning.insert(
            "summary".to_string(),
            "Automated evaluation using LLM-as-a-Judge".to_string(),
        );

        EvaluationResult {
            query: query.to_string(),
            answer,
            scores,
            reasoning,
            latency_ms,
        }
    }

    async fn evaluate_relevance(&self, query: &str, answer: &str) -> i32 {
        let prompt = format!(
            "You are an expert evaluator for a RAG system.\n\
             Your task is to rate the RELEVANCE of the answer to the query on a scale of 1 to 5.\n\n\
             Query: {}\n\
             Answer: {}\n\n\
             Rating Criteria:\n\
             1: Irrelevant answer, does not address the query at all.\n\
             3: Partially relevant, addresses some aspects but misses key points.\n\
             5: Highly relevant, directly and fully answers the query.\n\n\
             OUTPUT ONLY A SINGLE INTEGER (1-5). DO NOT EXPLAIN.\n",
            query, answer
        );

        match self.judge.generate(None, &prompt).await {
            Ok(result) => parse_score(&result),
            Err(e) => {
                error!(error = %e, "Relevance judging failed");
                0
            }
        }
    }

    async fn evaluate_faithfulness(&self, context: &str, answer: &str) -> i32 {
        let context = truncate_context(context);
        let prompt = format!(
            "You are an expert evaluator for a RAG system.\n\
             Your task is to rate the FAITHFULNESS of the answer based on the provided context on a scale of 1 to 5.\n\n\
             Context:\n{}\n\n\
             Answer: {}\n\n\
             Rating Criteria:\n\
             1: Hallucinated answer, contains information NOT found in the context.\n\
             3: Mixed faithfulness, some statements supported, others not.\n\
             5: Faithful answer, all statements are supported by the provided context.\n\n\
             OUTPUT ONLY A SINGLE INTEGER (1-5). DO NOT EXPLAIN.\n",
            context, answer
        );

        match self.judge.generate(None, &prompt).await {
            Ok(result) => parse_score(&result),
            Err(e) => {
                error!(error = %e, "Faithfulness judging failed");
                0
            }
        }
    }
}

fn truncate_context(context: &str) -> String {
    if context.chars().count() <= JUDGE_CONTEXT_MAX_CHARS {
        return context.to_string();
    }
    let cut: String = context.chars().take(JUDGE_CONTEXT_MAX_CHARS).collect();
    format!("{}...", cut)
}

/// First ASCII digit in the judge's response; 0 when there is none.
fn parse_score(text: &str) -> i32 {
    text.chars()
        .find(|c| c.is_ascii_digit())
        .and_then(|c| c.to_digit(10))
        .map(|d| d as i32)
        .unwrap_or(0)
}
