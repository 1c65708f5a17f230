//! Errors returned by the GitLab REST client.

use reqwest::{Method, StatusCode};
use thiserror::Error;

/// Maximum length of a raw response body carried in an error message.
const MAX_BODY_LENGTH: usize = 200;

/// A failed call against the GitLab API.
///
/// The display form mirrors what GitLab itself reported so that it can be
/// surfaced to the user unchanged.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response (DNS, TLS, connection reset, ...).
    #[error("{method} {url}: {source}")]
    Transport {
        /// HTTP method of the failed request.
        method: Method,
        /// Full request URL.
        url: String,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// GitLab answered with a non-success status.
    #[error("{method} {url}: {status} {message}")]
    Response {
        /// HTTP method of the failed request.
        method: Method,
        /// Full request URL.
        url: String,
        /// Status returned by GitLab.
        status: StatusCode,
        /// Error message extracted from the response body.
        message: String,
    },

    /// The response body could not be decoded.
    #[error("{method} {url}: invalid response body: {source}")]
    Decode {
        /// HTTP method of the request.
        method: Method,
        /// Full request URL.
        url: String,
        /// Decoding error.
        #[source]
        source: serde_json::Error,
    },

    /// A request URL could not be built from the base URL.
    #[error("invalid request URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    /// The HTTP status GitLab answered with, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Response { status, .. } => Some(*status),
            Self::Transport { source, .. } => source.status(),
            Self::Decode { .. } | Self::Url(_) => None,
        }
    }

    /// Whether GitLab reported the object as missing.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }
}

/// Pull the human-readable message out of a GitLab error body.
///
/// GitLab answers with either `{"message": ...}` (a string or a map of
/// field errors) or `{"error": "..."}`. Anything else is returned as a
/// truncated copy of the raw body.
pub(crate) fn error_message(body: &str) -> String {
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str(body) {
        for key in ["message", "error"] {
            match map.get(key) {
                Some(serde_json::Value::String(msg)) => return msg.clone(),
                Some(serde_json::Value::Null) | None => {},
                Some(other) => return other.to_string(),
            }
        }
    }
    truncate_body(body)
}

/// Truncate a body for logging or error reporting, dropping control characters.
pub(crate) fn truncate_body(body: &str) -> String {
    let cleaned: String = body
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .collect();

    if cleaned.len() > MAX_BODY_LENGTH {
        format!(
            "{}... [truncated, {} bytes total]",
            &cleaned[..MAX_BODY_LENGTH],
            body.len()
        )
    } else {
        cleaned
    }
}
