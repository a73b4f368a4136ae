use std::sync::OnceLock;

use scraper::Selector;

use super::{selector, Document, Extractor};
use crate::types::Category;

/// Inner markup of every `<p>` element.
///
/// Nested tags are kept as markup rather than flattened to text. A `<p>`
/// left open ends where the HTML parser implies its end tag.
pub struct ParagraphExtractor;

impl Extractor for ParagraphExtractor {
    fn category(&self) -> Category {
        Category::Paragraphs
    }

    fn extract(&self, doc: &Document<'_>) -> Vec<String> {
        static PARAGRAPHS: OnceLock<Selector> = OnceLock::new();
        let paragraphs = PARAGRAPHS.get_or_init(|| selector("p"));

        doc.tree().select(paragraphs).map(|p| p.inner_html()).collect()
    }
}
