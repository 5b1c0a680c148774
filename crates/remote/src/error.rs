//! Typed error enum for the remote backend client.

use thiserror::Error;

/// Errors from remote table operations.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),
    #[error("HTTP status {code}: {body}")]
    HttpStatus { code: u16, body: String },
    #[error("JSON parse error in {context}: {source}")]
    JsonParse {
        context: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("client initialization failed: {0}")]
    ClientInit(String),
}

impl RemoteError {
    /// Whether this error is transient and a later attempt may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::HttpRequest(_) => true,
            Self::HttpStatus { code, .. } => matches!(code, 408 | 425 | 429) || *code >= 500,
            Self::JsonParse { .. } | Self::ClientInit(_) => false,
        }
    }

    /// Whether the backend rejected the request itself (validation, conflict, auth).
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::HttpStatus { code, .. } if (400..500).contains(code)) && !self.is_transient()
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::HttpStatus { code: 404, .. })
    }
}
