//! pagescrape server — JSON over HTTP in front of the scrape pipeline.

pub mod config;
pub mod transport;
pub mod types;

pub use config::{ConfigOverrides, ServerConfig};
pub use transport::{router, AppState, HttpTransport};
pub use types::{ServerError, ServerResult};
