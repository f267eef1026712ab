//! Error types for the listening-history client

/// Result type alias for history operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while fetching or caching listening history
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP request failed (connection, timeout, body read)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Binary cache encoding/decoding failed
    #[error("Cache codec error: {0}")]
    Codec(#[from] bincode::Error),

    /// The endpoint answered with a non-success status and no structured error
    #[error("History API returned HTTP {0}")]
    Status(u16),

    /// The history API reported a structured failure
    #[error("History API error (code {code}): {message}. Please try again later")]
    Upstream { code: u32, message: String },

    /// A sync produced no songs at all
    #[error("Failed to retrieve any play history for '{0}'. Did you type the username correctly?")]
    NoHistory(String),

    /// Configuration error (from skconfig/anyhow)
    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a generic error from a string
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// True when the API itself reported the failure (as opposed to transport errors)
    pub fn is_upstream(&self) -> bool {
        matches!(self, Error::Upstream { .. })
    }
}
