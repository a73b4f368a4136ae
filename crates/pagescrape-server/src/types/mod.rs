//! Server-side types.

pub mod error;

pub use error::{ServerError, ServerResult};
