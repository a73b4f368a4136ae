//! Configuration loading and resolution.
//!
//! Every setting resolves CLI flag → environment variable → default.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use pagescrape::renderer::chromium::{ChromiumOptions, CHROMIUM_PATH_ENV, DEFAULT_MAX_CONTEXTS};
use pagescrape::renderer::{
    RenderOptions, DEFAULT_READY_SELECTOR, DEFAULT_RENDER_TIMEOUT, MAX_RENDER_TIMEOUT,
};

pub const ADDR_ENV: &str = "PAGESCRAPE_ADDR";
pub const TIMEOUT_ENV: &str = "PAGESCRAPE_TIMEOUT_SECS";
pub const MAX_CONTEXTS_ENV: &str = "PAGESCRAPE_MAX_CONTEXTS";
pub const READY_SELECTOR_ENV: &str = "PAGESCRAPE_READY_SELECTOR";

pub const DEFAULT_ADDR: &str = "0.0.0.0:8080";

/// Values given explicitly on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub addr: Option<String>,
    pub chromium: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    pub max_contexts: Option<usize>,
    pub ready_selector: Option<String>,
}

/// Fully resolved server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    /// `None` means auto-discover at startup.
    pub chromium_path: Option<PathBuf>,
    pub timeout: Duration,
    pub max_contexts: usize,
    pub ready_selector: String,
}

impl ServerConfig {
    /// Resolve against the process environment.
    pub fn resolve(overrides: ConfigOverrides) -> Result<Self> {
        Self::resolve_with(overrides, |key| std::env::var(key).ok())
    }

    /// Resolve against an arbitrary variable lookup.
    pub fn resolve_with<F>(overrides: ConfigOverrides, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let addr = overrides
            .addr
            .or_else(|| env(ADDR_ENV))
            .unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let addr: SocketAddr = addr
            .parse()
            .with_context(|| format!("invalid listen address '{addr}'"))?;

        let chromium_path = overrides
            .chromium
            .or_else(|| env(CHROMIUM_PATH_ENV).map(PathBuf::from));

        let timeout_secs = match overrides.timeout_secs {
            Some(secs) => secs,
            None => match env(TIMEOUT_ENV) {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .with_context(|| format!("{TIMEOUT_ENV}='{raw}' is not a number of seconds"))?,
                None => DEFAULT_RENDER_TIMEOUT.as_secs(),
            },
        };
        if timeout_secs == 0 {
            bail!("render timeout must be at least one second");
        }
        if timeout_secs > MAX_RENDER_TIMEOUT.as_secs() {
            bail!(
                "render timeout of {timeout_secs}s exceeds the maximum of {}s",
                MAX_RENDER_TIMEOUT.as_secs()
            );
        }

        let max_contexts = match overrides.max_contexts {
            Some(n) => n,
            None => match env(MAX_CONTEXTS_ENV) {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .with_context(|| format!("{MAX_CONTEXTS_ENV}='{raw}' is not a count"))?,
                None => DEFAULT_MAX_CONTEXTS,
            },
        };
        if max_contexts == 0 {
            bail!("max contexts must be at least 1");
        }

        let ready_selector = overrides
            .ready_selector
            .or_else(|| env(READY_SELECTOR_ENV))
            .unwrap_or_else(|| DEFAULT_READY_SELECTOR.to_string());

        Ok(Self {
            addr,
            chromium_path,
            timeout: Duration::from_secs(timeout_secs),
            max_contexts,
            ready_selector,
        })
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            timeout: self.timeout,
            ready_selector: self.ready_selector.clone(),
            ..RenderOptions::default()
        }
    }

    pub fn chromium_options(&self) -> ChromiumOptions {
        ChromiumOptions {
            executable: self.chromium_path.clone(),
            max_contexts: self.max_contexts,
        }
    }
}
