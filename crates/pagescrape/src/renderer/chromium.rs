//! Chromium-based renderer using chromiumoxide.
//!
//! Every context is a dedicated headless Chromium process with its own
//! throwaway profile directory, so cookies and storage never leak between
//! requests.

use super::{RenderContext, Renderer};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;

/// Environment variable pointing at a Chromium executable.
pub const CHROMIUM_PATH_ENV: &str = "PAGESCRAPE_CHROMIUM_PATH";

/// Default number of browser processes allowed at once.
pub const DEFAULT_MAX_CONTEXTS: usize = 4;

/// Find the Chromium binary path.
pub fn find_chromium(explicit: Option<&Path>) -> Option<PathBuf> {
    // 1. Explicit path from configuration
    if let Some(path) = explicit {
        if path.exists() {
            return Some(path.to_path_buf());
        }
        tracing::warn!("configured Chromium path {} does not exist", path.display());
    }

    // 2. PAGESCRAPE_CHROMIUM_PATH env
    if let Ok(p) = std::env::var(CHROMIUM_PATH_ENV) {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 3. System PATH
    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 4. Common macOS location
    if cfg!(target_os = "macos") {
        let common = PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Options for [`ChromiumRenderer`].
#[derive(Debug, Clone)]
pub struct ChromiumOptions {
    /// Chromium executable; discovered with [`find_chromium`] when `None`.
    pub executable: Option<PathBuf>,
    /// Maximum number of concurrently running browser processes.
    pub max_contexts: usize,
}

impl Default for ChromiumOptions {
    fn default() -> Self {
        Self {
            executable: None,
            max_contexts: DEFAULT_MAX_CONTEXTS,
        }
    }
}

/// Chromium-based renderer.
pub struct ChromiumRenderer {
    executable: PathBuf,
    slots: Arc<Semaphore>,
    active_count: Arc<AtomicUsize>,
}

impl ChromiumRenderer {
    /// Create a renderer. Fails when no Chromium executable can be found.
    ///
    /// No browser is started until a context is requested.
    pub fn new(options: ChromiumOptions) -> Result<Self> {
        let executable = find_chromium(options.executable.as_deref()).context(format!(
            "Chromium not found. Install Chrome/Chromium or set {CHROMIUM_PATH_ENV}."
        ))?;
        tracing::info!("using Chromium at {}", executable.display());

        Ok(Self {
            executable,
            slots: Arc::new(Semaphore::new(options.max_contexts.max(1))),
            active_count: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    fn browser_config(&self, profile_dir: &Path) -> Result<BrowserConfig> {
        BrowserConfig::builder()
            .chrome_executable(&self.executable)
            .new_headless_mode()
            .user_data_dir(profile_dir)
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
        let permit = Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .context("renderer is shut down")?;
        let slot = ActiveSlot::new(Arc::clone(&self.active_count), permit);

        let profile_dir = ProfileDir::create();
        let config = self.browser_config(profile_dir.path())?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        // Spawn the handler task
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        let lease = Lease {
            process: Some(BrowserProcess {
                browser,
                handler,
                profile_dir,
                _slot: slot,
            }),
        };

        let page = match lease.new_page().await {
            Ok(page) => page,
            Err(e) => {
                lease.release().await;
                return Err(e.context("failed to create new page"));
            }
        };

        tracing::debug!("browser context opened");
        Ok(Box::new(ChromiumContext { page, lease }))
    }

    fn active_contexts(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }
}

/// One counted semaphore slot; released on drop.
struct ActiveSlot {
    count: Arc<AtomicUsize>,
    _permit: OwnedSemaphorePermit,
}

impl ActiveSlot {
    fn new(count: Arc<AtomicUsize>, permit: OwnedSemaphorePermit) -> Self {
        count.fetch_add(1, Ordering::Relaxed);
        Self {
            count,
            _permit: permit,
        }
    }
}

impl Drop for ActiveSlot {
    fn drop(&mut self) {
        self.count.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Throwaway browser profile directory; removed on drop if still present.
struct ProfileDir(PathBuf);

impl ProfileDir {
    fn create() -> Self {
        Self(std::env::temp_dir().join(format!("pagescrape-{}", uuid::Uuid::new_v4())))
    }

    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for ProfileDir {
    fn drop(&mut self) {
        if !self.0.exists() {
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.0) {
            tracing::debug!("could not remove profile dir {}: {e}", self.0.display());
        }
    }
}

/// A running browser process plus everything that must be released with it.
struct BrowserProcess {
    browser: Browser,
    handler: JoinHandle<()>,
    profile_dir: ProfileDir,
    _slot: ActiveSlot,
}

impl BrowserProcess {
    /// Close the browser and reap it. Dropping the returned future midway
    /// still frees the slot and the profile directory.
    async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            tracing::debug!("graceful browser close failed, killing: {e}");
            if let Some(Err(e)) = self.browser.kill().await {
                tracing::warn!("failed to kill browser process: {e}");
            }
        }
        if let Err(e) = self.browser.wait().await {
            tracing::warn!("failed to reap browser process: {e}");
        }
        self.handler.abort();

        if let Err(e) = tokio::fs::remove_dir_all(self.profile_dir.path()).await {
            tracing::debug!(
                "could not remove profile dir {}: {e}",
                self.profile_dir.path().display()
            );
        }
    }
}

/// Owns a browser process until released.
///
/// A lease dropped without `release` (cancelled request, expired deadline)
/// schedules the same shutdown on the runtime.
struct Lease {
    process: Option<BrowserProcess>,
}

impl Lease {
    async fn new_page(&self) -> Result<Page> {
        let process = self.process.as_ref().context("browser already released")?;
        Ok(process.browser.new_page("about:blank").await?)
    }

    async fn release(mut self) {
        if let Some(process) = self.process.take() {
            process.shutdown().await;
        }
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        let Some(process) = self.process.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                tracing::debug!("browser lease dropped before release, tearing down");
                runtime.spawn(process.shutdown());
            }
            Err(_) => {
                tracing::warn!("browser lease dropped outside a runtime, killing process");
                drop(process);
            }
        }
    }
}

/// A single Chromium page in its own browser process.
pub struct ChromiumContext {
    page: Page,
    lease: Lease,
}

#[async_trait]
impl RenderContext for ChromiumContext {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.page
            .goto(url)
            .await
            .with_context(|| format!("navigation to {url} failed"))?;
        Ok(())
    }

    async fn is_visible(&self, selector: &str) -> Result<bool> {
        let query = format!("document.querySelector({})", serde_json::to_string(selector)?);
        let script = format!(
            "{query} !== null \
             && getComputedStyle({query}).display !== 'none' \
             && getComputedStyle({query}).visibility !== 'hidden' \
             && {query}.getClientRects().length > 0"
        );

        let result = self
            .page
            .evaluate(script)
            .await
            .context("visibility check failed")?;

        result
            .into_value::<bool>()
            .map_err(|e| anyhow::anyhow!("failed to convert visibility result: {e:?}"))
    }

    async fn title(&self) -> Result<String> {
        let title = self
            .page
            .get_title()
            .await
            .context("failed to get title")?;
        Ok(title.unwrap_or_default())
    }

    async fn outer_html(&self) -> Result<String> {
        let result = self
            .page
            .evaluate("document.documentElement.outerHTML")
            .await
            .context("failed to get HTML")?;

        result
            .into_value::<String>()
            .map_err(|e| anyhow::anyhow!("failed to convert HTML result: {e:?}"))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let this = *self;
        this.lease.release().await;
        Ok(())
    }
}
