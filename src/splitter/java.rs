//! Code-aware splitter for Java-like source files.
//!
//! Splits a source file along class and method boundaries instead of raw
//! character offsets:
//! - a method is never split across fragments; an oversized method becomes
//!   a fragment of its own
//! - the file header (package, imports, class declaration) prefixes the
//!   first fragment; fragments forced by the size budget are prefixed with
//!   a condensed context block (package + class declaration) behind a
//!   continuation marker
//! - fragments carry `class_name`, `method_name` (when a fragment is
//!   predominantly one method), and the covered line range

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::fragment::{Fragment, Metadata};
use crate::splitter::estimate_tokens;

/// Marker prefixed to fragments that continue a class from an earlier
/// fragment. Tests strip this block when reassembling the original.
pub const CONTINUATION_MARKER: &str = "// ... continued from previous chunk";

pub const DEFAULT_MAX_TOKENS: usize = 1500;

const UNKNOWN_CLASS: &str = "UnknownClass";

static CLASS_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:public|private|protected)?\s*(?:static)?\s*(?:final)?\s*(?:abstract)?\s*class\s+(\w+)",
    )
    .unwrap()
});

// Tolerates modifiers, generics, annotations on preceding lines, array
// return types, and throws clauses. Requires the opening brace so field
// declarations and abstract signatures do not count.
static METHOD_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:public|private|protected)?\s*(?:static)?\s*(?:final)?\s*(?:synchronized)?\s*(?:<[^>]+>\s*)?(?:\w+(?:<[^>]+>)?(?:\[\])?\s+)(\w+)\s*\([^)]*\)\s*(?:throws\s+[^{]+)?\{",
    )
    .unwrap()
});

/// Kind of block produced by the structural scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    /// Package, imports, class declaration, and anything before the first
    /// method (fields, static initializers).
    Header,
    /// One complete method, declaration through closing brace.
    Method,
    /// Class-level code between or after methods.
    ClassBody,
}

/// A contiguous run of source lines.
#[derive(Debug)]
struct CodeBlock {
    kind: BlockKind,
    method_name: Option<String>,
    /// 0-based inclusive line range into the source.
    start_line: usize,
    end_line: usize,
}

pub struct JavaSplitter {
    max_tokens: usize,
}

impl Default for JavaSplitter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TOKENS)
    }
}

impl JavaSplitter {
    pub fn new(max_tokens: usize) -> Self {
        Self { max_tokens }
    }

    /// Split Java source into fragments. `base_metadata` (source, filename,
    /// file_type) is cloned onto every fragment.
    pub fn split(&self, content: &str, base_metadata: &Metadata) -> Vec<Fragment> {
        if content.trim().is_empty() {
            return Vec::new();
        }

        let lines: Vec<&str> = content.split('\n').collect();
        let class_name = extract_class_name(content);
        let blocks = extract_code_blocks(&lines);
        let grouped = self.group_blocks(&lines, &blocks);

        let total_chunks = grouped.len();
        let mut fragments = Vec::with_capacity(total_chunks);
        for (index, chunk) in grouped.into_iter().enumerate() {
            let mut metadata = base_metadata.clone();
            metadata.set_chunk_position(index, total_chunks);
            metadata.set_chunk_type("java_code");
            metadata.set_class_name(class_name.clone());
            if let Some(method) = chunk.sole_method {
                metadata.set_method_name(method);
            }
            metadata.set_line_range(chunk.start_line + 1, chunk.end_line + 1);
            fragments.push(Fragment::new(chunk.content, metadata));
        }

        debug!(
            source = base_metadata.source(),
            chunks = fragments.len(),
            class = %class_name,
            "Split Java file into semantic chunks"
        );
        fragments
    }

    /// Pack blocks into chunks under the token budget. The header always
    /// opens the first chunk; forced continuation chunks are prefixed with
    /// the condensed class context. A single block over the budget stays
    /// whole (boundary preservation dominates sizing).
    fn group_blocks(&self, lines: &[&str], blocks: &[CodeBlock]) -> Vec<GroupedChunk> {
        let context = class_context(lines, blocks);

        let mut chunks: Vec<GroupedChunk> = Vec::new();
        let mut current = String::new();
        let mut current_tokens = 0usize;
        // Guards against flushing a chunk that holds only the continuation
        // prefix: a budget smaller than the prefix would otherwise emit
        // context-only fragments.
        let mut current_has_code = false;
        let mut current_methods: Vec<String> = Vec::new();
        let mut current_range: Option<(usize, usize)> = None;

        for block in blocks {
            let text = block_text(lines, block);
            let block_tokens = estimate_tokens(&text);

            if current_has_code && current_tokens + block_tokens > self.max_tokens {
                let (start, end) = current_range.unwrap_or((block.start_line, block.end_line));
                chunks.push(GroupedChunk::finish(current, current_methods, start, end));

                current = String::new();
                current.push_str(CONTINUATION_MARKER);
                if !context.is_empty() {
                    current.push('\n');
                    current.push_str(&context);
                }
                current_tokens = estimate_tokens(&current);
                current_has_code = false;
                current_methods = Vec::new();
                current_range = None;
            }

            // Blocks are contiguous line ranges; exactly one newline joins
            // consecutive blocks so unsplit content reassembles byte-exact.
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(&text);
            current_has_code = true;
            current_tokens += block_tokens;
            if let Some(name) = &block.method_name {
                current_methods.push(name.clone());
            }
            current_range = Some(match current_range {
                None => (block.start_line, block.end_line),
                Some((start, _)) => (start, block.end_line),
            });
        }

        if !current.is_empty() {
            let (start, end) = current_range.unwrap_or((0, lines.len().saturating_sub(1)));
            chunks.push(GroupedChunk::finish(current, current_methods, start, end));
        }

        chunks
    }
}

struct GroupedChunk {
    content: String,
    /// Set when the chunk contains exactly one method.
    sole_method: Option<String>,
    start_line: usize,
    end_line: usize,
}

impl GroupedChunk {
    fn finish(content: String, methods: Vec<String>, start_line: usize, end_line: usize) -> Self {
        let sole_method = match methods.as_slice() {
            [only] => Some(only.clone()),
            _ => None,
        };
        Self {
            content,
            sole_method,
            start_line,
            end_line,
        }
    }
}

/// Outer class name; first match wins on nested classes.
fn extract_class_name(content: &str) -> String {
    CLASS_PATTERN
        .captures(content)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| UNKNOWN_CLASS.to_string())
}

/// Structural scan: walk lines maintaining brace depth. A method starts
/// when a method-shaped declaration occurs at depth 1 (directly in the
/// class body) and ends on the line where depth returns to 1. Methods of
/// nested classes sit at depth > 1 and stay inside the enclosing block.
fn extract_code_blocks(lines: &[&str]) -> Vec<CodeBlock> {
    let mut blocks = Vec::new();
    let mut depth: i32 = 0;
    let mut block_start = 0usize;
    let mut kind = BlockKind::Header;
    let mut method_name: Option<String> = None;

    for (i, line) in lines.iter().enumerate() {
        let depth_before = depth;
        depth += brace_delta(line);

        if kind != BlockKind::Method && depth_before == 1 {
            // Class declarations win the tie when both shapes match a line
            // (a nested class header can look method-like to the regex).
            if !CLASS_PATTERN.is_match(line) {
                if let Some(captures) = METHOD_PATTERN.captures(line) {
                    if i > block_start {
                        blocks.push(CodeBlock {
                            kind,
                            method_name: None,
                            start_line: block_start,
                            end_line: i - 1,
                        });
                    }
                    kind = BlockKind::Method;
                    method_name = captures.get(1).map(|m| m.as_str().to_string());
                    block_start = i;

                    // Single-line methods close immediately.
                    if depth == 1 {
                        blocks.push(CodeBlock {
                            kind: BlockKind::Method,
                            method_name: method_name.take(),
                            start_line: block_start,
                            end_line: i,
                        });
                        kind = BlockKind::ClassBody;
                        block_start = i + 1;
                    }
                    continue;
                }
            }
        }

        if kind == BlockKind::Method && depth == 1 && depth_before > 1 {
            blocks.push(CodeBlock {
                kind: BlockKind::Method,
                method_name: method_name.take(),
                start_line: block_start,
                end_line: i,
            });
            kind = BlockKind::ClassBody;
            block_start = i + 1;
        }
    }

    if block_start < lines.len() {
        blocks.push(CodeBlock {
            kind,
            method_name: method_name.take(),
            start_line: block_start,
            end_line: lines.len() - 1,
        });
    }

    blocks
}

fn brace_delta(line: &str) -> i32 {
    let mut delta = 0;
    for c in line.chars() {
        match c {
            '{' => delta += 1,
            '}' => delta -= 1,
            _ => {}
        }
    }
    delta
}

fn block_text(lines: &[&str], block: &CodeBlock) -> String {
    lines[block.start_line..=block.end_line].join("\n")
}

/// Condensed class context for continuation chunks: package statement and
/// class/interface declaration lines from the header block.
fn class_context(lines: &[&str], blocks: &[CodeBlock]) -> String {
    let Some(header) = blocks.iter().find(|b| b.kind == BlockKind::Header) else {
        return String::new();
    };

    let mut context = Vec::new();
    for line in &lines[header.start_line..=header.end_line] {
        let trimmed = line.trim_start();
        if trimmed.starts_with("package ")
            || trimmed.starts_with("public class")
            || trimmed.starts_with("class ")
            || trimmed.starts_with("public interface")
        {
            context.push(*line);
        }
    }
    context.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const CALCULATOR: &str = r#"package com.example.math;

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

    fn base_metadata() -> Metadata {
        let mut metadata = Metadata::new();
        metadata.set_source("/repo/src/Calculator.java");
        metadata.set_filename("Calculator.java");
        metadata.set_file_type("java");
        metadata
    }

    #[test]
    fn test_calculator_chunking() {
        let splitter = JavaSplitter::default();
        let fragments = splitter.split(CALCULATOR, &base_metadata());

        assert!(!fragments.is_empty());
        for fragment in &fragments {
            assert_eq!(fragment.metadata.class_name(), "Calculator");
            assert_eq!(fragment.metadata.chunk_type(), "java_code");
        }
        // chunk_index contiguous from 0 to total_chunks - 1
        let total = fragments.len() as u64;
        for (i, fragment) in fragments.iter().enumerate() {
            assert_eq!(fragment.metadata.chunk_index(), Some(i as u64));
            assert_eq!(fragment.metadata.total_chunks(), Some(total));
        }
    }

    #[test]
    fn test_small_class_is_single_fragment_with_exact_content() {
        let splitter = JavaSplitter::default();
        let fragments = splitter.split(CALCULATOR, &base_metadata());
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].content, CALCULATOR);
    }

    #[test]
    fn test_methods_never_split_under_tiny_budget() {
        // A budget smaller than any single method forces one method per
        // fragment but never splits a method interior: the fragment holding
        // a declaration also holds that method's whole body.
        let splitter = JavaSplitter::new(20);
        let fragments = splitter.split(CALCULATOR, &base_metadata());
        assert!(fragments.len() > 1);

        let cases = [
            ("public int add", "return a + b;"),
            ("public int subtract", "return a - b;"),
            ("public int multiply", "return a * b;"),
            ("public double divide", "return (double) a / b;"),
        ];
        for (declaration, body) in cases {
            let holders: Vec<&Fragment> = fragments
                .iter()
                .filter(|f| f.content.contains(declaration))
                .collect();
            assert_eq!(holders.len(), 1, "{} split across fragments", declaration);
            assert!(
                holders[0].content.contains(body),
                "{} separated from its body",
                declaration
            );
        }
    }

    #[test]
    fn test_continuation_fragments_carry_context() {
        let splitter = JavaSplitter::new(20);
        let fragments = splitter.split(CALCULATOR, &base_metadata());
        assert!(fragments.len() > 1);
        for fragment in fragments.iter().skip(1) {
            assert!(fragment.content.starts_with(CONTINUATION_MARKER));
            assert!(fragment.content.contains("package com.example.math;"));
            assert!(fragment.content.contains("public class Calculator {"));
        }
    }

    #[test]
    fn test_single_method_fragment_has_method_name() {
        let splitter = JavaSplitter::new(20);
        let fragments = splitter.split(CALCULATOR, &base_metadata());
        let named: Vec<&str> = fragments
            .iter()
            .map(|f| f.metadata.method_name())
            .filter(|m| !m.is_empty())
            .collect();
        assert!(named.contains(&"add"));
        assert!(named.contains(&"divide"));
    }

    #[test]
    fn test_unknown_class() {
        let splitter = JavaSplitter::default();
        let fragments = splitter.split("int x = 1;\n", &base_metadata());
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].metadata.class_name(), "UnknownClass");
    }

    #[test]
    fn test_empty_file_yields_no_fragments() {
        let splitter = JavaSplitter::default();
        assert!(splitter.split("", &base_metadata()).is_empty());
        assert!(splitter.split("   \n  \n", &base_metadata()).is_empty());
    }

    #[test]
    fn test_nested_class_outer_name_wins() {
        let source = r#"package com.example;

public class Outer {
    private static class Inner {
        void hidden() {
            int x = 1;
        }
    }

    public void visible() {
        int y = 2;
    }
}
"#;
        let splitter = JavaSplitter::default();
        let fragments = splitter.split(source, &base_metadata());
        for fragment in &fragments {
            assert_eq!(fragment.metadata.class_name(), "Outer");
        }
    }

    #[test]
    fn test_nested_class_methods_not_emitted_separately() {
        let source = r#"public class Outer {
    private static class Inner {
        void hidden() {
            int x = 1;
        }
    }

    public void visible() {
        int y = 2;
    }
}
"#;
        let lines: Vec<&str> = source.split('\n').collect();
        let blocks = extract_code_blocks(&lines);
        let methods: Vec<&str> = blocks
            .iter()
            .filter_map(|b| b.method_name.as_deref())
            .collect();
        // `hidden` sits at depth > 1 inside Inner and must not surface.
        assert_eq!(methods, vec!["visible"]);
    }

    #[test]
    fn test_oversized_method_emitted_whole() {
        let mut body = String::from("public class Big {\n    public void huge() {\n");
        for i in 0..200 {
            body.push_str(&format!("        int v{} = {};\n", i, i));
        }
        body.push_str("    }\n}\n");

        let splitter = JavaSplitter::new(50);
        let fragments = splitter.split(&body, &base_metadata());
        let method_fragment = fragments
            .iter()
            .find(|f| f.metadata.method_name() == "huge")
            .expect("huge method fragment");
        assert!(method_fragment.content.contains("int v0 = 0;"));
        assert!(method_fragment.content.contains("int v199 = 199;"));
    }

    #[test]
    fn test_line_ranges_are_one_based_and_ordered() {
        let splitter = JavaSplitter::new(20);
        let fragments = splitter.split(CALCULATOR, &base_metadata());
        for fragment in &fragments {
            let start = fragment.metadata.start_line().unwrap();
            let end = fragment.metadata.end_line().unwrap();
            assert!(start >= 1);
            assert!(end >= start);
        }
    }

    #[test]
    fn test_method_with_throws_and_generics() {
        let source = r#"public class Repo {
    public <T> java.util.List<T> findAll(Class<T> type) throws java.io.IOException {
        return java.util.Collections.emptyList();
    }
}
"#;
        let lines: Vec<&str> = source.split('\n').collect();
        let blocks = extract_code_blocks(&lines);
        let methods: Vec<&str> = blocks
            .iter()
            .filter_map(|b| b.method_name.as_deref())
            .collect();
        assert_eq!(methods, vec!["findAll"]);
    }
}
