//! Scrape orchestration: one render, then the selected extractors.

use std::sync::Arc;

use crate::extract::{default_extractors, Document, Extractor};
use crate::renderer::{render, RenderOptions, Renderer};
use crate::types::{CategorySet, RenderedPage, ScrapeRequest, ScrapeResponse, ScrapeResult};

/// Drives a renderer and the extraction engine for scrape requests.
///
/// Holds no per-request state; a single `Scraper` serves concurrent requests,
/// each getting its own render context.
pub struct Scraper {
    renderer: Arc<dyn Renderer>,
    extractors: Vec<Box<dyn Extractor>>,
    options: RenderOptions,
}

impl Scraper {
    pub fn new(renderer: Arc<dyn Renderer>, options: RenderOptions) -> Self {
        Self::with_extractors(renderer, options, default_extractors())
    }

    /// Use a custom extractor list. The first extractor for a category wins;
    /// a requested category with no extractor comes back empty.
    pub fn with_extractors(
        renderer: Arc<dyn Renderer>,
        options: RenderOptions,
        extractors: Vec<Box<dyn Extractor>>,
    ) -> Self {
        Self {
            renderer,
            extractors,
            options,
        }
    }

    pub fn renderer(&self) -> &Arc<dyn Renderer> {
        &self.renderer
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Render the request URL once and extract the effective categories.
    ///
    /// A render failure fails the whole scrape; no extractor runs.
    pub async fn scrape(&self, request: &ScrapeRequest) -> ScrapeResult<ScrapeResponse> {
        tracing::info!(
            "scraping {} ({} categories)",
            request.url,
            request.categories.len()
        );

        let page = render(self.renderer.as_ref(), &request.url, &self.options)
            .await
            .map_err(|e| {
                tracing::warn!("render failed: {e}");
                e
            })?;

        Ok(self.extract(&page, request.categories))
    }

    /// Build a response from an already rendered page.
    pub fn extract(&self, page: &RenderedPage, categories: CategorySet) -> ScrapeResponse {
        let mut response = ScrapeResponse::new(page.title.clone());
        if categories.is_empty() {
            return response;
        }

        let doc = Document::parse(&page.html);
        for category in categories.iter() {
            let values = match self.extractors.iter().find(|e| e.category() == category) {
                Some(extractor) => extractor.extract(&doc),
                None => {
                    tracing::warn!("no extractor registered for {category}");
                    Vec::new()
                }
            };
            tracing::debug!("{category}: {} matches", values.len());
            response.set(category, values);
        }

        response
    }
}
