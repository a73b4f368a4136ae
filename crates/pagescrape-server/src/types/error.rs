//! Error type for the HTTP surface and its JSON body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use pagescrape::{RenderError, ScrapeError};

/// All errors a request can end in.
#[derive(thiserror::Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// Stable machine-readable kind, reported as `error.kind`.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerError::InvalidRequest(_) => "invalid_request",
            ServerError::Render(_) => "render",
            ServerError::Io(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Render(_) | ServerError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "error": {
                "kind": self.kind(),
                "message": self.to_string(),
            }
        })
    }
}

impl From<ScrapeError> for ServerError {
    fn from(e: ScrapeError) -> Self {
        match e {
            ScrapeError::InvalidRequest(msg) => ServerError::InvalidRequest(msg),
            ScrapeError::Render(e) => ServerError::Render(e),
        }
    }
}

impl From<serde_json::Error> for ServerError {
    fn from(e: serde_json::Error) -> Self {
        ServerError::InvalidRequest(format!("malformed JSON body: {e}"))
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        if self.status().is_server_error() {
            tracing::error!("{self}");
        } else {
            tracing::debug!("{self}");
        }
        (self.status(), Json(self.to_json())).into_response()
    }
}

pub type ServerResult<T> = Result<T, ServerError>;
