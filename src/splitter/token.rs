//! Fixed-window splitter for file types with no structural shape to
//! exploit (plain text, YAML, Gradle scripts, properties files).
//!
//! Lines are packed greedily into windows under the token budget. Lines are
//! never torn, so a single line longer than the budget becomes its own
//! fragment.

use crate::fragment::{Fragment, Metadata};
use crate::splitter::estimate_tokens;

pub const DEFAULT_MAX_TOKENS: usize = 512;

pub struct TokenSplitter {
    max_tokens: usize,
}

impl Default for TokenSplitter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TOKENS)
    }
}

impl TokenSplitter {
    pub fn new(max_tokens: usize) -> Self {
        Self { max_tokens }
    }

    pub fn split(&self, content: &str, base_metadata: &Metadata) -> Vec<Fragment> {
        if content.trim().is_empty() {
            return Vec::new();
        }

        let mut windows: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut current_tokens = 0usize;

        for line in content.split('\n') {
            let line_tokens = estimate_tokens(line);

            if current_tokens + line_tokens > self.max_tokens && !current.is_empty() {
                windows.push(current);
                current = String::new();
                current_tokens = 0;
            }

            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
            current_tokens += line_tokens;
        }
        if !current.is_empty() {
            windows.push(current);
        }

        let total_chunks = windows.len();
        windows
            .into_iter()
            .enumerate()
            .map(|(index, window)| {
                let mut metadata = base_metadata.clone();
                metadata.set_chunk_position(index, total_chunks);
                metadata.set_chunk_type("generic");
                Fragment::new(window, metadata)
            })
            .collect()
    }
}
