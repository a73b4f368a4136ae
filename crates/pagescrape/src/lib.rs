//! pagescrape — render a page in headless Chromium and extract links,
//! paragraphs, images, headers and email addresses from it.

pub mod extract;
pub mod renderer;
pub mod scrape;
pub mod types;

pub use extract::{default_extractors, Document, Extractor};
pub use renderer::chromium::{ChromiumOptions, ChromiumRenderer};
pub use renderer::{render, NoopRenderer, RenderContext, RenderError, RenderOptions, Renderer};
pub use scrape::Scraper;
pub use types::*;
