//! Structure-aware splitter for Markdown documents.
//!
//! Sections are delimited by ATX headers (`#` through `######` at the start
//! of a line). Whole sections are packed greedily into fragments under the
//! token budget; a section that alone exceeds the budget becomes its own
//! fragment rather than being torn apart.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::fragment::{Fragment, Metadata};
use crate::splitter::estimate_tokens;

pub const DEFAULT_MAX_TOKENS: usize = 1000;

static HEADER_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(#{1,6})\s+(.+)$").unwrap());

/// One header-delimited section: a 0-based inclusive line range.
struct Section {
    start_line: usize,
    end_line: usize,
}

pub struct MarkdownSplitter {
    max_tokens: usize,
}

impl Default for MarkdownSplitter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TOKENS)
    }
}

impl MarkdownSplitter {
    pub fn new(max_tokens: usize) -> Self {
        Self { max_tokens }
    }

    pub fn split(&self, content: &str, base_metadata: &Metadata) -> Vec<Fragment> {
        if content.trim().is_empty() {
            return Vec::new();
        }

        let lines: Vec<&str> = content.split('\n').collect();
        let sections = extract_sections(&lines);
        let grouped = self.group_sections(&lines, &sections);

        let total_chunks = grouped.len();
        let mut fragments = Vec::with_capacity(total_chunks);
        for (index, chunk_content) in grouped.into_iter().enumerate() {
            let mut metadata = base_metadata.clone();
            metadata.set_chunk_position(index, total_chunks);
            metadata.set_chunk_type("markdown");
            fragments.push(Fragment::new(chunk_content, metadata));
        }

        debug!(
            source = base_metadata.source(),
            chunks = fragments.len(),
            "Split Markdown file into sections"
        );
        fragments
    }

    fn group_sections(&self, lines: &[&str], sections: &[Section]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut current_tokens = 0usize;

        for section in sections {
            let text = lines[section.start_line..=section.end_line].join("\n");
            let section_tokens = estimate_tokens(&text);

            if current_tokens + section_tokens > self.max_tokens && !current.is_empty() {
                chunks.push(current);
                current = String::new();
                current_tokens = 0;
            }

            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(&text);
            current_tokens += section_tokens;
        }

        if !current.is_empty() {
            chunks.push(current);
        }

        chunks
    }
}

/// Collect sections: a header line plus its body up to the next header.
/// Content before the first header forms a preamble section.
fn extract_sections(lines: &[&str]) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut start = 0usize;

    for (i, line) in lines.iter().enumerate() {
        if HEADER_PATTERN.is_match(line) && i > 0 {
            sections.push(Section {
                start_line: start,
                end_line: i - 1,
            });
            start = i;
        }
    }

    if start < lines.len() {
        sections.push(Section {
            start_line: start,
            end_line: lines.len() - 1,
        });
    }

    sections
}
