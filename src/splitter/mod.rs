//! Code-aware chunking of loaded documents into fragments.
//!
//! A tagged [`Splitter`] selects the strategy per file type: Java sources
//! get class/method-boundary chunking, Markdown gets header-section
//! chunking, everything else goes through the fixed-window token splitter.
//! PDF pages never reach a splitter: the loader already emits one fragment
//! per page.

pub mod java;
pub mod markdown;
pub mod token;

pub use java::{JavaSplitter, CONTINUATION_MARKER};
pub use markdown::MarkdownSplitter;
pub use token::TokenSplitter;

use crate::config::ChunkConfig;
use crate::fragment::{Fragment, Metadata};

/// Character-based token estimator: 1 token ~= 4 characters of code or
/// prose. Good enough for budget sizing; never used for model limits.
pub fn estimate_tokens(text: &str) -> usize {
    text.len() / 4
}

/// Splitter strategies, tagged by kind.
pub enum Splitter {
    Java(JavaSplitter),
    Markdown(MarkdownSplitter),
    Token(TokenSplitter),
}

impl Splitter {
    /// Pick the splitter for a file type, using the configured budgets.
    pub fn for_file_type(file_type: &str, config: &ChunkConfig) -> Self {
        match file_type.to_ascii_lowercase().as_str() {
            "java" => Splitter::Java(JavaSplitter::new(config.java_max_tokens)),
            "md" => Splitter::Markdown(MarkdownSplitter::new(config.markdown_max_tokens)),
            _ => Splitter::Token(TokenSplitter::new(config.generic_max_tokens)),
        }
    }

    /// Split a loaded document into fragments. An empty document yields an
    /// empty list.
    pub fn split(&self, content: &str, base_metadata: &Metadata) -> Vec<Fragment> {
        match self {
            Splitter::Java(splitter) => splitter.split(content, base_metadata),
            Splitter::Markdown(splitter) => splitter.split(content, base_metadata),
            Splitter::Token(splitter) => splitter.split(content, base_metadata),
        }
    }
}
