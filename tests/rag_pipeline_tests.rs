//! Orchestrator and evaluator behavior over the full in-memory stack.

mod common;

use std::sync::Arc;

use coderag::{ChatRequest, KeywordIndex, RagEvaluator, VectorStore};

use common::{build_stack, fragment, ScriptedGenerator};

async fn seeded(generator: Arc<ScriptedGenerator>) -> common::TestStack {
    let stack = build_stack(generator);
    let corpus = vec![
        fragment(
            "/repo/src/Calculator.java",
            "public class Calculator { public int add(int a, int b) { return a + b; } }",
            "java",
        ),
        fragment(
            "/repo/README.md",
            "# Calculator\n\nThe calculator module adds numbers.",
            "md",
        ),
    ];
    stack.vector_store.add(corpus.clone()).await.unwrap();
    stack.keyword_index.add(&corpus).await.unwrap();
    stack
}

#[tokio::test]
async fn test_chat_binds_citations_in_result_order() {
    let generator = Arc::new(ScriptedGenerator::new(["Addition lives in Calculator [1]."]));
    let stack = seeded(generator).await;

    let request = ChatRequest::new("how does the calculator add numbers")
        .with_similarity_threshold(0.0);
    let response = stack.rag_service.chat(request).await;

    assert_eq!(response.answer, "Addition lives in Calculator [1].");
    assert!(!response.sources.is_empty());
    for (i, source) in response.sources.iter().enumerate() {
        assert_eq!(source.citation_number, i + 1);
        assert!(!source.source.is_empty());
        assert!(source.content.chars().count() <= 203);
    }
    assert_eq!(
        response.metadata.documents_retrieved,
        response.sources.len()
    );
    assert_eq!(response.metadata.model, "scripted-test-model");
}

#[tokio::test]
async fn test_chat_empty_retrieval_gives_canonical_no_results() {
    let generator = Arc::new(ScriptedGenerator::new(["should never be called"]));
    let stack = build_stack(generator);

    let response = stack
        .rag_service
        .chat(ChatRequest::new("anything at all"))
        .await;

    assert_eq!(response.answer, coderag::rag::NO_RESULTS_ANSWER);
    assert!(response.sources.is_empty());
    assert_eq!(response.metadata.documents_retrieved, 0);
}

#[tokio::test]
async fn test_generator_failure_degrades_with_sources_kept() {
    let generator = Arc::new(ScriptedGenerator::failing());
    let stack = seeded(generator).await;

    let request =
        ChatRequest::new("calculator addition").with_similarity_threshold(0.0);
    let response = stack.rag_service.chat(request).await;

    assert_eq!(response.answer, coderag::rag::GENERATION_ERROR_ANSWER);
    // Retrieval succeeded, so the sources still come back.
    assert!(!response.sources.is_empty());
}

#[tokio::test]
async fn test_pii_masked_before_retrieval() {
    // The query's PII must not leak into retrieval: a corpus document
    // containing the literal email would otherwise match lexically.
    let generator = Arc::new(ScriptedGenerator::new(["ok [1]."]));
    let stack = build_stack(generator);
    let corpus = vec![fragment(
        "/repo/notes.txt",
        "contact someone.secret@corp.example for the calculator keys",
        "txt",
    )];
    stack.vector_store.add(corpus.clone()).await.unwrap();
    stack.keyword_index.add(&corpus).await.unwrap();

    let request = ChatRequest::new("who is someone.secret@corp.example")
        .with_similarity_threshold(0.99);
    let response = stack.rag_service.chat(request).await;

    // The lexical side sees only the placeholder tokens, which do not
    // match the document; with the threshold closed the semantic side is
    // quiet too, so retrieval comes back empty.
    assert_eq!(response.answer, coderag::rag::NO_RESULTS_ANSWER);
}

#[tokio::test]
async fn test_evaluator_scores_relevance_and_faithfulness() {
    // Answer generator first, then judge says "5" for relevance and "4"
    // for faithfulness.
    let generator = Arc::new(ScriptedGenerator::new(["The add method sums operands [1]."]));
    let stack = seeded(generator).await;

    let judge = Arc::new(ScriptedGenerator::new(["5", "4"]));
    let evaluator = RagEvaluator::new(stack.rag_service.clone(), judge);

    let result = evaluator
        .evaluate("how does the add method work in the calculator")
        .await;
    assert_eq!(result.scores.get("relevance"), Some(&5));
    assert_eq!(result.scores.get("faithfulness"), Some(&4));
    assert!(result.latency_ms > 0);
    assert_eq!(result.reasoning.get("summary").map(String::as_str),
        Some("Automated evaluation using LLM-as-a-Judge"));
}

#[tokio::test]
async fn test_evaluator_empty_context_skips_faithfulness() {
    let generator = Arc::new(ScriptedGenerator::new(Vec::<String>::new()));
    let stack = build_stack(generator);

    let judge = Arc::new(ScriptedGenerator::new(["3"]));
    let evaluator = RagEvaluator::new(stack.rag_service.clone(), judge);

    let result = evaluator.evaluate("unanswerable question").await;
    // No documents ingested: no context, faithfulness not judged.
    assert_eq!(result.scores.get("faithfulness"), Some(&0));
    assert_eq!(result.scores.get("relevance"), Some(&3));
}

#[tokio::test]
async fn test_judge_garbage_parses_to_zero() {
    let generator = Arc::new(ScriptedGenerator::new(["answer [1]."]));
    let stack = seeded(generator).await;

    let judge = Arc::new(ScriptedGenerator::new(["excellent!", "perfect"]));
    let evaluator = RagEvaluator::new(stack.rag_service.clone(), judge);

    let result = evaluator
        .evaluate("how does the add method work in the calculator")
        .await;
    assert_eq!(result.scores.get("relevance"), Some(&0));
    assert_eq!(result.scores.get("faithfulness"), Some(&0));
}
