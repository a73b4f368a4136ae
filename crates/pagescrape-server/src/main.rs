//! pagescrape server — entry point.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use pagescrape::{ChromiumRenderer, NoopRenderer, ScrapePayload, ScrapeRequest, Scraper};
use pagescrape_server::config::{ConfigOverrides, ServerConfig};
use pagescrape_server::transport::{AppState, HttpTransport};

#[derive(Parser)]
#[command(
    name = "pagescrape-server",
    about = "Render pages in headless Chromium and extract links, text, images, headers and emails",
    version
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args, Default)]
struct BrowserArgs {
    /// Path to the Chromium/Chrome executable.
    /// Also reads PAGESCRAPE_CHROMIUM_PATH.
    #[arg(long)]
    chromium: Option<PathBuf>,

    /// Hard limit on one render, in seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Maximum number of browser contexts open at once.
    #[arg(long)]
    max_contexts: Option<usize>,

    /// CSS selector that must be visible before the page is read.
    #[arg(long)]
    ready_selector: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (default).
    Serve {
        /// Listen address (host:port). Also reads PAGESCRAPE_ADDR.
        #[arg(long)]
        addr: Option<String>,

        #[command(flatten)]
        browser: BrowserArgs,
    },

    /// Scrape a single URL and print the result as JSON.
    Scrape {
        /// Absolute http(s) URL to render.
        url: String,

        #[arg(long)]
        link: bool,
        #[arg(long)]
        paragraph: bool,
        #[arg(long)]
        image: bool,
        #[arg(long)]
        header: bool,
        #[arg(long)]
        email: bool,
        /// Extract every category.
        #[arg(long)]
        all: bool,

        #[command(flatten)]
        browser: BrowserArgs,
    },

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   pagescrape-server completions bash > ~/.local/share/bash-completion/completions/pagescrape-server
    ///   pagescrape-server completions zsh > ~/.zfunc/_pagescrape-server
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

fn overrides(addr: Option<String>, browser: BrowserArgs) -> ConfigOverrides {
    ConfigOverrides {
        addr,
        chromium: browser.chromium,
        timeout_secs: browser.timeout_secs,
        max_contexts: browser.max_contexts,
        ready_selector: browser.ready_selector,
    }
}

/// Build a scraper over Chromium, or over the no-op renderer when no binary exists.
fn build_scraper(config: &ServerConfig) -> (Scraper, bool) {
    match ChromiumRenderer::new(config.chromium_options()) {
        Ok(renderer) => {
            tracing::info!("Chromium: {}", renderer.executable().display());
            (
                Scraper::new(Arc::new(renderer), config.render_options()),
                true,
            )
        }
        Err(e) => {
            tracing::warn!("{e:#}; scrapes will fail until Chromium is installed");
            (
                Scraper::new(Arc::new(NoopRenderer), config.render_options()),
                false,
            )
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command.unwrap_or(Commands::Serve {
        addr: None,
        browser: BrowserArgs::default(),
    }) {
        Commands::Serve { addr, browser } => {
            let config = ServerConfig::resolve(overrides(addr, browser))?;
            tracing::info!("pagescrape server v{}", env!("CARGO_PKG_VERSION"));
            tracing::info!(
                "Render timeout: {}s, max contexts: {}, ready selector: {}",
                config.timeout.as_secs(),
                config.max_contexts,
                config.ready_selector
            );

            let (scraper, chromium_available) = build_scraper(&config);
            let transport = HttpTransport::new(AppState::new(scraper, chromium_available));
            transport.run(config.addr).await?;
        }

        Commands::Scrape {
            url,
            link,
            paragraph,
            image,
            header,
            email,
            all,
            browser,
        } => {
            let config = ServerConfig::resolve(overrides(None, browser))?;
            let payload = ScrapePayload {
                url,
                link,
                paragraph,
                image,
                header,
                email,
                all,
            };

            let request = match ScrapeRequest::from_payload(&payload) {
                Ok(request) => request,
                Err(e) => {
                    eprintln!("Error: {e}");
                    std::process::exit(1);
                }
            };

            let (scraper, _) = build_scraper(&config);
            match scraper.scrape(&request).await {
                Ok(response) => println!("{}", serde_json::to_string_pretty(&response)?),
                Err(e) => {
                    eprintln!("Error: {e}");
                    std::process::exit(1);
                }
            }
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "pagescrape-server", &mut std::io::stdout());
        }
    }

    Ok(())
}
