use std::sync::OnceLock;

use scraper::Selector;

use super::{selector, Document, Extractor};
use crate::types::Category;

/// `href` values of anchors that point at `http`/`https` targets.
///
/// The prefix test is case-sensitive, so relative, `mailto:`, `javascript:`
/// and `HTTP://` links are all skipped. Values are reported unchanged.
pub struct LinkExtractor;

impl Extractor for LinkExtractor {
    fn category(&self) -> Category {
        Category::Links
    }

    fn extract(&self, doc: &Document<'_>) -> Vec<String> {
        static ANCHORS: OnceLock<Selector> = OnceLock::new();
        let anchors = ANCHORS.get_or_init(|| selector("a[href]"));

        doc.tree()
            .select(anchors)
            .filter_map(|a| a.value().attr("href"))
            .filter(|href| href.starts_with("http"))
            .map(str::to_string)
            .collect()
    }
}
