//! Content extraction from rendered markup.
//!
//! The markup is parsed once into a [`Document`]; every [`Extractor`] reads
//! from that shared tree (or, for emails, the raw text). Extractors are pure:
//! results are in document order, duplicates are kept, and input without any
//! match yields an empty vec.

mod emails;
mod headers;
mod images;
mod links;
mod paragraphs;

use scraper::{Html, Selector};

use crate::types::Category;

pub use emails::EmailExtractor;
pub use headers::HeaderExtractor;
pub use images::ImageExtractor;
pub use links::LinkExtractor;
pub use paragraphs::ParagraphExtractor;

/// Rendered markup together with its parsed DOM tree.
pub struct Document<'a> {
    markup: &'a str,
    tree: Html,
}

impl<'a> Document<'a> {
    pub fn parse(markup: &'a str) -> Self {
        Self {
            markup,
            tree: Html::parse_document(markup),
        }
    }

    /// The markup exactly as rendered.
    pub fn markup(&self) -> &'a str {
        self.markup
    }

    pub fn tree(&self) -> &Html {
        &self.tree
    }
}

/// Extracts one content category from a document.
pub trait Extractor: Send + Sync {
    fn category(&self) -> Category;
    fn extract(&self, doc: &Document<'_>) -> Vec<String>;
}

/// One extractor per category, in [`Category::ALL`] order.
pub fn default_extractors() -> Vec<Box<dyn Extractor>> {
    vec![
        Box::new(LinkExtractor),
        Box::new(ParagraphExtractor),
        Box::new(ImageExtractor),
        Box::new(HeaderExtractor),
        Box::new(EmailExtractor),
    ]
}

pub fn extract_links(markup: &str) -> Vec<String> {
    LinkExtractor.extract(&Document::parse(markup))
}

pub fn extract_paragraphs(markup: &str) -> Vec<String> {
    ParagraphExtractor.extract(&Document::parse(markup))
}

pub fn extract_images(markup: &str) -> Vec<String> {
    ImageExtractor.extract(&Document::parse(markup))
}

pub fn extract_headers(markup: &str) -> Vec<String> {
    HeaderExtractor.extract(&Document::parse(markup))
}

pub fn extract_emails(markup: &str) -> Vec<String> {
    EmailExtractor.extract(&Document::parse(markup))
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector is valid")
}
