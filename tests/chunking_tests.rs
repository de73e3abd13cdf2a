//! Chunking round-trips and the ingestion-level view of the splitters.

mod common;

use std::fs;
use std::sync::Arc;

use coderag::splitter::{JavaSplitter, MarkdownSplitter, TokenSplitter, CONTINUATION_MARKER};
use coderag::Metadata;

use common::{build_stack, ScriptedGenerator};

const CALCULATOR_JAVA: &str = r#"package com.example.math;

import java.util.Objects;

public class Calculator {

    public int add(int a, int b) {
        return a + b;
    }

    public int subtract(int a, int b) {
        return a - b;
    }

    public int multiply(int a, int b) {
        return a * b;
    }

    public double divide(int a, int b) {
        if (b == 0) {
            throw new IllegalArgumentException("division by zero");
        }
        return (double) a / b;
    }
}
"#;

fn java_metadata() -> Metadata {
    let mut metadata = Metadata::new();
    metadata.set_source("/repo/src/Calculator.java");
    metadata.set_filename("Calculator.java");
    metadata.set_file_type("java");
    metadata
}

/// Strip the continuation context a forced split inserts: the marker line
/// plus the condensed package/class lines that follow it.
fn strip_continuation_context(content: &str) -> String {
    let mut lines: Vec<&str> = content.split('\n').collect();
    if lines.first() == Some(&CONTINUATION_MARKER) {
        lines.remove(0);
        while let Some(line) = lines.first() {
            let trimmed = line.trim_start();
            if trimmed.starts_with("package ")
                || trimmed.starts_with("public class")
                || trimmed.starts_with("class ")
                || trimmed.starts_with("public interface")
            {
                lines.remove(0);
            } else {
                break;
            }
        }
    }
    lines.join("\n")
}

#[test]
fn test_java_unsplit_concatenation_is_exact() {
    let splitter = JavaSplitter::default();
    let fragments = splitter.split(CALCULATOR_JAVA, &java_metadata());
    let joined = fragments
        .iter()
        .map(|f| f.content.clone())
        .collect::<Vec<_>>()
        .join("\n");
    assert_eq!(joined, CALCULATOR_JAVA);
}

#[test]
fn test_java_forced_split_round_trips_modulo_markers() {
    let splitter = JavaSplitter::new(30);
    let fragments = splitter.split(CALCULATOR_JAVA, &java_metadata());
    assert!(fragments.len() > 1);

    let joined = fragments
        .iter()
        .map(|f| strip_continuation_context(&f.content))
        .collect::<Vec<_>>()
        .join("\n");
    assert_eq!(joined, CALCULATOR_JAVA);
}

#[test]
fn test_calculator_boundary_scenario() {
    let splitter = JavaSplitter::default();
    let fragments = splitter.split(CALCULATOR_JAVA, &java_metadata());

    assert!(!fragments.is_empty());
    let total = fragments.len() as u64;
    for (i, fragment) in fragments.iter().enumerate() {
        assert_eq!(fragment.metadata.class_name(), "Calculator");
        assert_eq!(fragment.metadata.chunk_type(), "java_code");
        assert_eq!(fragment.metadata.chunk_index(), Some(i as u64));
        assert_eq!(fragment.metadata.total_chunks(), Some(total));
    }
}

#[test]
fn test_markdown_concatenation_is_exact() {
    let doc = "# One\n\nalpha\n\n## Two\n\nbeta\n\n## Three\n\ngamma\n";
    let mut metadata = Metadata::new();
    metadata.set_source("/repo/README.md");
    metadata.set_file_type("md");

    for budget in [3, 8, 1000] {
        let splitter = MarkdownSplitter::new(budget);
        let fragments = splitter.split(doc, &metadata);
        let joined = fragments
            .iter()
            .map(|f| f.content.clone())
            .collect::<Vec<_>>()
            .join("\n");
        assert_eq!(joined, doc, "round trip failed at budget {}", budget);
    }
}

#[test]
fn test_token_splitter_concatenation_is_exact() {
    let doc = (0..40)
        .map(|i| format!("line number {} with some words", i))
        .collect::<Vec<_>>()
        .join("\n");
    let mut metadata = Metadata::new();
    metadata.set_source("/repo/notes.txt");
    metadata.set_file_type("txt");

    for budget in [5, 50, 10_000] {
        let splitter = TokenSplitter::new(budget);
        let fragments = splitter.split(&doc, &metadata);
        let joined = fragments
            .iter()
            .map(|f| f.content.clone())
            .collect::<Vec<_>>()
            .join("\n");
        assert_eq!(joined, doc, "round trip failed at budget {}", budget);
    }
}

#[tokio::test]
async fn test_ingested_fragments_query_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("Calculator.java"), CALCULATOR_JAVA).unwrap();
    fs::write(
        dir.path().join("README.md"),
        "# Calculator\n\nAdds, subtracts, multiplies, divides.\n",
    )
    .unwrap();

    let stack = build_stack(Arc::new(ScriptedGenerator::new(Vec::<String>::new())));
    let count = stack.ingestion_service.ingest(dir.path()).await.unwrap();
    assert!(count >= 2);

    let results = stack
        .hybrid_search
        .search("calculator divide", 5, 0.0, None)
        .await;
    assert!(!results.is_empty());
    assert!(results.len() <= 5);

    let java_hit = results
        .iter()
        .find(|f| f.metadata.file_type() == "java")
        .expect("java fragment retrieved");
    assert_eq!(java_hit.metadata.class_name(), "Calculator");
}
