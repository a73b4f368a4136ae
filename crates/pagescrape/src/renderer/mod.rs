//! Renderer abstraction for browser-based page rendering.
//!
//! Defines the `Renderer` and `RenderContext` traits that abstract over
//! the browser engine (currently Chromium via chromiumoxide), and the
//! bounded-time [`render`] operation built on top of them.

pub mod chromium;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::time::Instant;
use url::Url;

use crate::types::RenderedPage;

/// Default upper bound on a whole render.
pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest render timeout honoured; larger values are clamped to it.
pub const MAX_RENDER_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// Default bound on closing a context once the render is over.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default readiness selector.
pub const DEFAULT_READY_SELECTOR: &str = "body";

const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A browser engine that can create isolated rendering contexts.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Acquire a fresh, isolated browser context.
    async fn new_context(&self) -> Result<Box<dyn RenderContext>>;
    /// Number of currently open contexts.
    fn active_contexts(&self) -> usize;
}

/// A single browser context, good for exactly one navigation.
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Navigate to a URL.
    async fn navigate(&mut self, url: &str) -> Result<()>;
    /// Whether the first element matching `selector` is currently visible.
    async fn is_visible(&self, selector: &str) -> Result<bool>;
    /// Document title, empty when the page has none.
    async fn title(&self) -> Result<String>;
    /// Serialized outer markup of the document root.
    async fn outer_html(&self) -> Result<String>;
    /// Close this context and release the browser behind it.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// A no-op renderer used when Chromium is unavailable.
///
/// Every context request fails, so scrapes report a render error while the
/// rest of the service keeps running.
pub struct NoopRenderer;

#[async_trait]
impl Renderer for NoopRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
        Err(anyhow::anyhow!("Browser not available: no Chromium executable found"))
    }
    fn active_contexts(&self) -> usize {
        0
    }
}

/// Render options shared by every request of a scraper.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Bound on the entire render: context creation, navigation, readiness wait and reads.
    pub timeout: Duration,
    /// CSS selector that must become visible before the page is read.
    pub ready_selector: String,
    /// Bound on closing the context afterwards, outside the render timeout.
    pub close_timeout: Duration,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_RENDER_TIMEOUT,
            ready_selector: DEFAULT_READY_SELECTOR.to_string(),
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
        }
    }
}

/// Errors produced while rendering a page.
#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("Browser context unavailable: {source:#}")]
    Context { source: anyhow::Error },

    #[error("Navigation to {url} failed: {source:#}")]
    Navigation { url: String, source: anyhow::Error },

    #[error("Render of {url} timed out after {}s", .timeout.as_secs_f64())]
    Timeout { url: String, timeout: Duration },

    #[error("Failed to read rendered page {url}: {source:#}")]
    Read { url: String, source: anyhow::Error },
}

impl RenderError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, RenderError::Timeout { .. })
    }
}

/// Render `url` once in a fresh context.
///
/// The context is closed on every exit path, including timeout. Closing is
/// bounded by `options.close_timeout`; a failed or slow close is logged and
/// never replaces the render outcome. Timeouts above [`MAX_RENDER_TIMEOUT`]
/// are clamped.
pub async fn render(
    renderer: &dyn Renderer,
    url: &Url,
    options: &RenderOptions,
) -> Result<RenderedPage, RenderError> {
    let timeout = options.timeout.min(MAX_RENDER_TIMEOUT);
    let deadline = Instant::now() + timeout;
    let timed_out = || RenderError::Timeout {
        url: url.to_string(),
        timeout,
    };

    let mut ctx = match tokio::time::timeout_at(deadline, renderer.new_context()).await {
        Ok(Ok(ctx)) => ctx,
        Ok(Err(source)) => return Err(RenderError::Context { source }),
        Err(_) => return Err(timed_out()),
    };

    let outcome = tokio::time::timeout_at(
        deadline,
        drive(ctx.as_mut(), url.as_str(), &options.ready_selector),
    )
    .await;

    match tokio::time::timeout(options.close_timeout, ctx.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!("failed to close render context for {url}: {e:#}"),
        Err(_) => tracing::warn!(
            "closing render context for {url} took longer than {:?}, dropped it",
            options.close_timeout
        ),
    }

    match outcome {
        Ok(result) => result,
        Err(_) => Err(timed_out()),
    }
}

/// Navigate, wait for readiness, then read title and markup.
async fn drive(
    ctx: &mut dyn RenderContext,
    url: &str,
    ready_selector: &str,
) -> Result<RenderedPage, RenderError> {
    ctx.navigate(url)
        .await
        .map_err(|source| RenderError::Navigation {
            url: url.to_string(),
            source,
        })?;

    loop {
        match ctx.is_visible(ready_selector).await {
            Ok(true) => break,
            Ok(false) => {}
            // The page may still be replacing its execution context (redirects, reloads).
            Err(e) => tracing::debug!("visibility check on {url} failed, retrying: {e:#}"),
        }
        tokio::time::sleep(READY_POLL_INTERVAL).await;
    }
    tracing::debug!("'{ready_selector}' visible on {url}");

    let read_err = |source| RenderError::Read {
        url: url.to_string(),
        source,
    };
    let title = ctx.title().await.map_err(read_err)?;
    let html = ctx.outer_html().await.map_err(read_err)?;

    Ok(RenderedPage { title, html })
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scriptable in-memory renderer for unit tests.

    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum Behavior {
        Serve,
        FailContext,
        FailNavigation,
        NeverVisible,
        VisibleAfterPolls(usize),
        /// The first `n` visibility checks fail, then the page is ready.
        VisibilityErrors(usize),
        /// Serves normally, but `close` never completes.
        HangOnClose,
    }

    pub struct FakeRenderer {
        pub title: String,
        pub html: String,
        pub behavior: Behavior,
        pub opened: Arc<AtomicUsize>,
        pub closed: Arc<AtomicUsize>,
        /// Contexts dropped, whether closed first or abandoned.
        pub dropped: Arc<AtomicUsize>,
    }

    impl FakeRenderer {
        pub fn serving(title: &str, html: &str) -> Self {
            Self {
                title: title.to_string(),
                html: html.to_string(),
                behavior: Behavior::Serve,
                opened: Arc::new(AtomicUsize::new(0)),
                closed: Arc::new(AtomicUsize::new(0)),
                dropped: Arc::new(AtomicUsize::new(0)),
            }
        }

        pub fn with_behavior(mut self, behavior: Behavior) -> Self {
            self.behavior = behavior;
            self
        }

        pub fn opened(&self) -> usize {
            self.opened.load(Ordering::SeqCst)
        }

        pub fn closed(&self) -> usize {
            self.closed.load(Ordering::SeqCst)
        }

        pub fn dropped(&self) -> usize {
            self.dropped.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Renderer for FakeRenderer {
        async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
            if self.behavior == Behavior::FailContext {
                anyhow::bail!("browser process unavailable");
            }
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeContext {
                title: self.title.clone(),
                html: self.html.clone(),
                behavior: self.behavior,
                polls: AtomicUsize::new(0),
                closed: Arc::clone(&self.closed),
                dropped: Arc::clone(&self.dropped),
            }))
        }

        fn active_contexts(&self) -> usize {
            self.opened() - self.dropped()
        }
    }

    struct FakeContext {
        title: String,
        html: String,
        behavior: Behavior,
        polls: AtomicUsize,
        closed: Arc<AtomicUsize>,
        dropped: Arc<AtomicUsize>,
    }

    impl Drop for FakeContext {
        fn drop(&mut self) {
            self.dropped.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl RenderContext for FakeContext {
        async fn navigate(&mut self, url: &str) -> Result<()> {
            if self.behavior == Behavior::FailNavigation {
                anyhow::bail!("net::ERR_NAME_NOT_RESOLVED at {url}");
            }
            Ok(())
        }

        async fn is_visible(&self, _selector: &str) -> Result<bool> {
            let polls = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
            match self.behavior {
                Behavior::NeverVisible => Ok(false),
                Behavior::VisibleAfterPolls(n) => Ok(polls > n),
                Behavior::VisibilityErrors(n) if polls <= n => {
                    anyhow::bail!("Execution context was destroyed")
                }
                _ => Ok(true),
            }
        }

        async fn title(&self) -> Result<String> {
            Ok(self.title.clone())
        }

        async fn outer_html(&self) -> Result<String> {
            Ok(self.html.clone())
        }

        async fn close(self: Box<Self>) -> Result<()> {
            if self.behavior == Behavior::HangOnClose {
                std::future::pending::<()>().await;
            }
            self.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{Behavior, FakeRenderer};
    use super::*;

    fn url() -> Url {
        Url::parse("https://example.com/").unwrap()
    }

    fn quick() -> RenderOptions {
        RenderOptions {
            timeout: Duration::from_millis(300),
            ..RenderOptions::default()
        }
    }

    #[tokio::test]
    async fn renders_title_and_markup() {
        let renderer = FakeRenderer::serving("Hello", "<html><body><p>x</p></body></html>");
        let page = render(&renderer, &url(), &quick()).await.unwrap();

        assert_eq!(page.title, "Hello");
        assert!(page.html.contains("<p>x</p>"));
        assert_eq!(renderer.opened(), 1);
        assert_eq!(renderer.closed(), 1);
    }

    #[tokio::test]
    async fn waits_until_ready_selector_is_visible() {
        let renderer =
            FakeRenderer::serving("t", "<html></html>").with_behavior(Behavior::VisibleAfterPolls(2));
        let page = render(&renderer, &url(), &quick()).await.unwrap();
        assert_eq!(page.title, "t");
    }

    #[tokio::test]
    async fn timeout_closes_context() {
        let renderer =
            FakeRenderer::serving("t", "<html></html>").with_behavior(Behavior::NeverVisible);
        let err = render(&renderer, &url(), &quick()).await.unwrap_err();

        assert!(err.is_timeout(), "expected timeout, got {err}");
        assert_eq!(renderer.closed(), 1);
        assert_eq!(renderer.active_contexts(), 0);
    }

    #[tokio::test]
    async fn navigation_failure_closes_context() {
        let renderer =
            FakeRenderer::serving("t", "<html></html>").with_behavior(Behavior::FailNavigation);
        let err = render(&renderer, &url(), &quick()).await.unwrap_err();

        assert!(matches!(err, RenderError::Navigation { .. }), "got {err}");
        assert!(err.to_string().contains("ERR_NAME_NOT_RESOLVED"));
        assert_eq!(renderer.closed(), 1);
    }

    #[tokio::test]
    async fn context_failure_is_reported() {
        let renderer =
            FakeRenderer::serving("t", "<html></html>").with_behavior(Behavior::FailContext);
        let err = render(&renderer, &url(), &quick()).await.unwrap_err();

        assert!(matches!(err, RenderError::Context { .. }), "got {err}");
        assert_eq!(renderer.opened(), 0);
    }

    #[tokio::test]
    async fn cancelled_render_releases_context() {
        let renderer =
            FakeRenderer::serving("t", "<html></html>").with_behavior(Behavior::NeverVisible);
        let options = RenderOptions {
            timeout: Duration::from_secs(30),
            ..RenderOptions::default()
        };

        let outcome =
            tokio::time::timeout(Duration::from_millis(50), render(&renderer, &url(), &options))
                .await;

        assert!(outcome.is_err(), "render should still be pending");
        assert_eq!(renderer.opened(), 1);
        assert_eq!(renderer.closed(), 0);
        assert_eq!(renderer.dropped(), 1);
        assert_eq!(renderer.active_contexts(), 0);
    }

    #[tokio::test]
    async fn visibility_errors_are_retried() {
        let renderer =
            FakeRenderer::serving("t", "<html></html>").with_behavior(Behavior::VisibilityErrors(2));
        let page = render(&renderer, &url(), &quick()).await.unwrap();

        assert_eq!(page.title, "t");
        assert_eq!(renderer.closed(), 1);
    }

    #[tokio::test]
    async fn persistent_visibility_errors_time_out() {
        let renderer = FakeRenderer::serving("t", "<html></html>")
            .with_behavior(Behavior::VisibilityErrors(usize::MAX));
        let err = render(&renderer, &url(), &quick()).await.unwrap_err();

        assert!(err.is_timeout(), "expected timeout, got {err}");
        assert_eq!(renderer.closed(), 1);
    }

    #[tokio::test]
    async fn hung_close_is_bounded() {
        let renderer =
            FakeRenderer::serving("t", "<html></html>").with_behavior(Behavior::HangOnClose);
        let options = RenderOptions {
            close_timeout: Duration::from_millis(50),
            ..quick()
        };

        let page = tokio::time::timeout(Duration::from_secs(5), render(&renderer, &url(), &options))
            .await
            .expect("close should not hold the render")
            .unwrap();

        assert_eq!(page.title, "t");
        assert_eq!(renderer.closed(), 0);
        assert_eq!(renderer.dropped(), 1);
    }

    #[tokio::test]
    async fn oversized_timeout_is_clamped() {
        let renderer = FakeRenderer::serving("t", "<html></html>");
        let options = RenderOptions {
            timeout: Duration::from_secs(u64::MAX),
            ..RenderOptions::default()
        };
        let page = render(&renderer, &url(), &options).await.unwrap();
        assert_eq!(page.title, "t");

        let stuck = FakeRenderer::serving("t", "<html></html>").with_behavior(Behavior::NeverVisible);
        let pending =
            tokio::time::timeout(Duration::from_millis(50), render(&stuck, &url(), &options)).await;
        assert!(pending.is_err());
        assert_eq!(stuck.active_contexts(), 0);
    }

    #[tokio::test]
    async fn noop_renderer_fails_with_context_error() {
        let err = render(&NoopRenderer, &url(), &quick()).await.unwrap_err();
        assert!(matches!(err, RenderError::Context { .. }));
        assert_eq!(NoopRenderer.active_contexts(), 0);
    }
}
