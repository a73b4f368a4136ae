//! Transport layer for scrape requests.

pub mod http;

pub use http::{router, AppState, HttpTransport};
