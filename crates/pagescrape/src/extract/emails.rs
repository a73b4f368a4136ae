use std::sync::OnceLock;

use regex::Regex;

use super::{Document, Extractor};
use crate::types::Category;

// ASCII word boundaries: an address glued to non-ASCII text (CJK pages) still matches.
const EMAIL_PATTERN: &str = r"(?-u:\b)[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}(?-u:\b)";

/// Email-shaped substrings anywhere in the raw markup.
///
/// Runs over the text as rendered, so addresses inside attributes and
/// scripts count too. No validation beyond the pattern, no deduplication.
pub struct EmailExtractor;

impl Extractor for EmailExtractor {
    fn category(&self) -> Category {
        Category::Emails
    }

    fn extract(&self, doc: &Document<'_>) -> Vec<String> {
        static EMAIL: OnceLock<Regex> = OnceLock::new();
        let email = EMAIL.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("email regex is valid"));

        email
            .find_iter(doc.markup())
            .map(|m| m.as_str().to_string())
            .collect()
    }
}
