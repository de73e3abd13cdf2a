//! Fragment data model.
//!
//! A [`Fragment`] is the unit of retrieval: a text body plus an open-schema
//! metadata map. Fragments are created by the splitters, stored by the
//! backends, and immutable afterwards except for the transient score fields
//! the hybrid fuser attaches on returned results.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Reserved metadata vocabulary. Unknown keys pass through untouched.
pub mod keys {
    // Identity
    pub const SOURCE: &str = "source";
    pub const FILENAME: &str = "filename";
    pub const FILE_TYPE: &str = "file_type";

    // Chunking
    pub const CHUNK_INDEX: &str = "chunk_index";
    pub const TOTAL_CHUNKS: &str = "total_chunks";
    pub const CHUNK_TYPE: &str = "chunk_type";

    // Structural (code)
    pub const CLASS_NAME: &str = "class_name";
    pub const METHOD_NAME: &str = "method_name";
    pub const START_LINE: &str = "start_line";
    pub const END_LINE: &str = "end_line";

    // Transient, attached by the fuser on returned results only
    pub const HYBRID_SCORE: &str = "hybrid_score";
    pub const SEMANTIC_SCORE: &str = "semantic_score";
    pub const KEYWORD_SCORE: &str = "keyword_score";
}

/// Open-schema metadata map with typed accessors for the reserved keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(HashMap<String, Value>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw access for unknown keys.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// String view of a key. Missing or non-string values read as the empty
    /// string, which is what the filter predicates expect.
    pub fn str_or_empty(&self, key: &str) -> &str {
        match self.0.get(key) {
            Some(Value::String(s)) => s.as_str(),
            _ => "",
        }
    }

    fn u64_value(&self, key: &str) -> Option<u64> {
        self.0.get(key).and_then(Value::as_u64)
    }

    fn f32_value(&self, key: &str) -> Option<f32> {
        self.0.get(key).and_then(Value::as_f64).map(|v| v as f32)
    }

    // Identity

    pub fn source(&self) -> &str {
        self.str_or_empty(keys::SOURCE)
    }

    pub fn set_source(&mut self, source: impl Into<String>) {
        self.insert(keys::SOURCE, Value::String(source.into()));
    }

    pub fn filename(&self) -> &str {
        self.str_or_empty(keys::FILENAME)
    }

    pub fn set_filename(&mut self, filename: impl Into<String>) {
        self.insert(keys::FILENAME, Value::String(filename.into()));
    }

    pub fn file_type(&self) -> &str {
        self.str_or_empty(keys::FILE_TYPE)
    }

    pub fn set_file_type(&mut self, file_type: impl Into<String>) {
        self.insert(keys::FILE_TYPE, Value::String(file_type.into()));
    }

    // Chunking

    pub fn chunk_index(&self) -> Option<u64> {
        self.u64_value(keys::CHUNK_INDEX)
    }

    pub fn total_chunks(&self) -> Option<u64> {
        self.u64_value(keys::TOTAL_CHUNKS)
    }

    pub fn set_chunk_position(&mut self, chunk_index: usize, total_chunks: usize) {
        self.insert(keys::CHUNK_INDEX, Value::from(chunk_index as u64));
        self.insert(keys::TOTAL_CHUNKS, Value::from(total_chunks as u64));
    }

    pub fn chunk_type(&self) -> &str {
        self.str_or_empty(keys::CHUNK_TYPE)
    }

    pub fn set_chunk_type(&mut self, chunk_type: impl Into<String>) {
        self.insert(keys::CHUNK_TYPE, Value::String(chunk_type.into()));
    }

    // Structural

    pub fn class_name(&self) -> &str {
        self.str_or_empty(keys::CLASS_NAME)
    }

    pub fn set_class_name(&mut self, class_name: impl Into<String>) {
        self.insert(keys::CLASS_NAME, Value::String(class_name.into()));
    }

    pub fn method_name(&self) -> &str {
        self.str_or_empty(keys::METHOD_NAME)
    }

    pub fn set_method_name(&mut self, method_name: impl Into<String>) {
        self.insert(keys::METHOD_NAME, Value::String(method_name.into()));
    }

    pub fn start_line(&self) -> Option<u64> {
        self.u64_value(keys::START_LINE)
    }

    pub fn end_line(&self) -> Option<u64> {
        self.u64_value(keys::END_LINE)
    }

    /// Set the 1-based line range covered by a fragment.
    pub fn set_line_range(&mut self, start_line: usize, end_line: usize) {
        debug_assert!(start_line >= 1 && end_line >= start_line);
        self.insert(keys::START_LINE, Value::from(start_line as u64));
        self.insert(keys::END_LINE, Value::from(end_line as u64));
    }

    /// `"start-end"` when both bounds are present.
    pub fn line_range(&self) -> Option<String> {
        match (self.start_line(), self.end_line()) {
            (Some(start), Some(end)) => Some(format!("{}-{}", start, end)),
            _ => None,
        }
    }

    // Transient scores

    pub fn hybrid_score(&self) -> Option<f32> {
        self.f32_value(keys::HYBRID_SCORE)
    }

    pub fn semantic_score(&self) -> Option<f32> {
        self.f32_value(keys::SEMANTIC_SCORE)
    }

    pub fn keyword_score(&self) -> Option<f32> {
        self.f32_value(keys::KEYWORD_SCORE)
    }

    pub fn set_scores(&mut self, hybrid: f32, semantic: f32, keyword: f32) {
        self.insert(keys::HYBRID_SCORE, Value::from(hybrid as f64));
        self.insert(keys::SEMANTIC_SCORE, Value::from(semantic as f64));
        self.insert(keys::KEYWORD_SCORE, Value::from(keyword as f64));
    }

    /// Flatten everything but source/filename into a `key=value` display
    /// string, keys sorted for stable output.
    pub fn display_string(&self) -> String {
        let mut entries: Vec<String> = self
            .0
            .iter()
            .filter(|(k, _)| k.as_str() != keys::SOURCE && k.as_str() != keys::FILENAME)
            .map(|(k, v)| match v {
                Value::String(s) => format!("{}={}", k, s),
                other => format!("{}={}", k, other),
            })
            .collect();
        entries.sort();
        entries.join(", ")
    }
}

/// The unit of retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    /// Text body. Never empty for stored fragments.
    pub content: String,
    /// Embedding vector, populated by the vector store on commit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    pub metadata: Metadata,
}

impl Fragment {
    pub fn new(content: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            content: content.into(),
            embedding: None,
            metadata,
        }
    }

    /// Identity across backends: `source + "_" + content hash`. Two results
    /// from different backends collide iff both fields match. Uses a
    /// truncated SHA-256 rather than a toy hash so cross-backend
    /// deduplication does not collide in practice.
    pub fn identity(&self) -> String {
        format!("{}_{}", self.metadata.source(), content_hash(&self.content))
    }
}

/// First 16 hex chars of the SHA-256 of the content (64 bits).
pub fn content_hash(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    hex[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_fragment() -> Fragment {
        let mut metadata = Metadata::new();
        metadata.set_source("/repo/src/Calculator.java");
        metadata.set_filename("Calculator.java");
        metadata.set_file_type("java");
        metadata.set_chunk_type("java_code");
        metadata.set_chunk_position(0, 2);
        metadata.set_class_name("Calculator");
        metadata.set_line_range(10, 42);
        Fragment::new("public int add(int a, int b) { return a + b; }", metadata)
    }

    #[test]
    fn test_typed_accessors() {
        let fragment = sample_fragment();
        assert_eq!(fragment.metadata.source(), "/repo/src/Calculator.java");
        assert_eq!(fragment.metadata.file_type(), "java");
        assert_eq!(fragment.metadata.chunk_index(), Some(0));
        assert_eq!(fragment.metadata.total_chunks(), Some(2));
        assert_eq!(fragment.metadata.class_name(), "Calculator");
        assert_eq!(fragment.metadata.line_range().as_deref(), Some("10-42"));
        // Unset keys read as empty, not as an error.
        assert_eq!(fragment.metadata.method_name(), "");
    }

    #[test]
    fn test_identity_is_stable_and_content_sensitive() {
        let a = sample_fragment();
        let b = sample_fragment();
        assert_eq!(a.identity(), b.identity());

        let mut c = sample_fragment();
        c.content.push_str(" // changed");
        assert_ne!(a.identity(), c.identity());
    }

    #[test]
    fn test_content_hash_is_64_bit_hex() {
        let hash = content_hash("hello");
        assert_eq!(hash.len(), 16);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_transient_scores() {
        let mut fragment = sample_fragment();
        fragment.metadata.set_scores(0.85, 1.0, 0.5);
        assert!((fragment.metadata.hybrid_score().unwrap() - 0.85).abs() < 1e-6);
        assert!((fragment.metadata.semantic_score().unwrap() - 1.0).abs() < 1e-6);
        assert!((fragment.metadata.keyword_score().unwrap() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_display_string_excludes_identity_fields() {
        let fragment = sample_fragment();
        let display = fragment.metadata.display_string();
        assert!(display.contains("class_name=Calculator"));
        assert!(display.contains("chunk_type=java_code"));
        assert!(!display.contains("filename="));
        assert!(!display.contains("source="));
    }

    #[test]
    fn test_unknown_keys_pass_through() {
        let mut metadata = Metadata::new();
        metadata.insert("page_number", Value::from(3u64));
        assert_eq!(metadata.get("page_number").and_then(Value::as_u64), Some(3));
    }
}
