use std::sync::OnceLock;

use scraper::Selector;

use super::{selector, Document, Extractor};
use crate::types::Category;

/// `src` of every `<img>`; an image without `src` contributes `""`.
pub struct ImageExtractor;

impl Extractor for ImageExtractor {
    fn category(&self) -> Category {
        Category::Images
    }

    fn extract(&self, doc: &Document<'_>) -> Vec<String> {
        static IMAGES: OnceLock<Selector> = OnceLock::new();
        let images = IMAGES.get_or_init(|| selector("img"));

        doc.tree()
            .select(images)
            .map(|img| img.value().attr("src").unwrap_or_default().to_string())
            .collect()
    }
}
