//! PII detection and masking.
//!
//! Applied as a pre-flight transformation on any text leaving the system
//! boundary (queries headed for the generator). Each detected instance is
//! replaced by a uniquely numbered placeholder; the placeholder-to-original
//! mapping is returned so the mask stays reversible within the request.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

/// Result of a masking pass: the redacted text plus the placeholder
/// mappings. The mapping lives only for the duration of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskingResult {
    pub masked_text: String,
    /// placeholder -> original value
    pub mappings: HashMap<String, String>,
}

// Patterns are compiled lazily; a failed compile is treated as "that
// category detects nothing" rather than a hard error, so a pattern-engine
// problem degrades to passing the text through untouched.
static EMAIL_PATTERN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").ok());

static PHONE_PATTERN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"\b\d{3}[-.]?\d{3,4}(?:[-.]?\d{4})?\b").ok());

static API_KEY_PATTERN: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r#"(?i)(api[_-]?key|token|secret)[:\s=]*['"]?([a-zA-Z0-9_-]{16,})['"]?"#).ok()
});

static PASSWORD_PATTERN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r#"(?i)(password|passwd|pwd)[:\s]*['"]?([^\s'"]{8,})['"]?"#).ok());

/// Detects and masks personally identifiable information in text.
#[derive(Debug, Clone, Copy, Default)]
pub struct PiiDetector;

impl PiiDetector {
    pub fn new() -> Self {
        Self
    }

    /// Mask PII in the given text.
    ///
    /// Categories are applied in fixed order: EMAIL, PHONE, API_KEY,
    /// PASSWORD. The order matters because email and phone shapes can
    /// superficially overlap key/password value syntax; running them first
    /// means each character position is redacted at most once. For API keys
    /// and passwords only the value is replaced; the prefix stays verbatim.
    pub fn mask(&self, text: &str) -> MaskingResult {
        if text.is_empty() {
            return MaskingResult {
                masked_text: text.to_string(),
                mappings: HashMap::new(),
            };
        }

        let mut mappings = HashMap::new();
        let mut masked = text.to_string();

        masked = mask_whole_match(&masked, EMAIL_PATTERN.as_ref(), "EMAIL", &mut mappings);
        masked = mask_whole_match(&masked, PHONE_PATTERN.as_ref(), "PHONE", &mut mappings);
        masked = mask_value_group(&masked, API_KEY_PATTERN.as_ref(), "API_KEY", &mut mappings);
        masked = mask_value_group(&masked, PASSWORD_PATTERN.as_ref(), "PASSWORD", &mut mappings);

        if !mappings.is_empty() {
            debug!(instances = mappings.len(), "Masked PII in text");
        }

        MaskingResult {
            masked_text: masked,
            mappings,
        }
    }

    /// One-way variant: mask and drop the mappings. Used where no
    /// restoration context is carried.
    pub fn mask_prompt(&self, prompt: &str) -> String {
        let result = self.mask(prompt);
        if !result.mappings.is_empty() {
            debug!(
                instances = result.mappings.len(),
                "Masked PII in prompt (one-way)"
            );
        }
        result.masked_text
    }

    /// Restore original values from masked text. Left inverse of [`mask`]
    /// on the placeholders it produced.
    ///
    /// [`mask`]: PiiDetector::mask
    pub fn restore(&self, masked_text: &str, mappings: &HashMap<String, String>) -> String {
        if mappings.is_empty() {
            return masked_text.to_string();
        }

        let mut result = masked_text.to_string();
        for (placeholder, original) in mappings {
            result = result.replace(placeholder, original);
        }
        result
    }
}

fn placeholder(pii_type: &str, counter: usize) -> String {
    format!("[{}_REDACTED_{}]", pii_type, counter)
}

/// Replace every match of `pattern` with a numbered placeholder.
fn mask_whole_match(
    text: &str,
    pattern: Option<&Regex>,
    pii_type: &str,
    mappings: &mut HashMap<String, String>,
) -> String {
    let Some(pattern) = pattern else {
        warn!(pii_type, "PII pattern unavailable, category skipped");
        return text.to_string();
    };

    let mut result = String::with_capacity(text.len());
    let mut last_end = 0;
    let mut counter = 1;

    for found in pattern.find_iter(text) {
        let token = placeholder(pii_type, counter);
        counter += 1;
        mappings.insert(token.clone(), found.as_str().to_string());
        result.push_str(&text[last_end..found.start()]);
        result.push_str(&token);
        last_end = found.end();
    }
    result.push_str(&text[last_end..]);
    result
}

/// Replace only the value capture (group 2) of each match, retaining the
/// prefix (group 1) and surrounding separators verbatim.
fn mask_value_group(
    text: &str,
    pattern: Option<&Regex>,
    pii_type: &str,
    mappings: &mut HashMap<String, String>,
) -> String {
    let Some(pattern) = pattern else {
        warn!(pii_type, "PII pattern unavailable, category skipped");
        return text.to_string();
    };

    let mut result = String::with_capacity(text.len());
    let mut last_end = 0;
    let mut counter = 1;

    for captures in pattern.captures_iter(text) {
        let Some(value) = captures.get(2) else {
            continue;
        };
        let token = placeholder(pii_type, counter);
        counter += 1;
        mappings.insert(token.clone(), value.as_str().to_string());
        result.push_str(&text[last_end..value.start()]);
        result.push_str(&token);
        last_end = value.end();
    }
    result.push_str(&text[last_end..]);
    result
}
