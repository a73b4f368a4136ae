use std::sync::OnceLock;

use scraper::Selector;

use super::{selector, Document, Extractor};
use crate::types::Category;

/// Inner markup of `h1`..`h6` elements, level-major.
///
/// All `h1` come first in document order, then all `h2`, and so on. The
/// result is not in overall document order when levels interleave.
pub struct HeaderExtractor;

impl Extractor for HeaderExtractor {
    fn category(&self) -> Category {
        Category::Headers
    }

    fn extract(&self, doc: &Document<'_>) -> Vec<String> {
        static LEVELS: OnceLock<Vec<Selector>> = OnceLock::new();
        let levels =
            LEVELS.get_or_init(|| (1..=6u8).map(|level| selector(&format!("h{level}"))).collect());

        levels
            .iter()
            .flat_map(|level| doc.tree().select(level).map(|h| h.inner_html()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::extract::extract_headers;

    #[test]
    fn levels_come_before_document_order() {
        assert_eq!(extract_headers("<h2>X</h2><h1>Y</h1>"), vec!["Y", "X"]);
    }

    #[test]
    fn document_order_within_a_level() {
        let html = "<h3>c1</h3><h1>a1</h1><h3>c2</h3><h6>f</h6><h1>a2</h1><h2>b</h2>";
        assert_eq!(
            extract_headers(html),
            vec!["a1", "a2", "b", "c1", "c2", "f"]
        );
    }

    #[test]
    fn nested_markup_is_kept() {
        assert_eq!(
            extract_headers("<h1>Hello <em>there</em></h1>"),
            vec!["Hello <em>there</em>"]
        );
    }

    #[test]
    fn header_element_is_not_a_heading() {
        assert!(extract_headers("<header><nav>menu</nav></header><hr>").is_empty());
    }
}
