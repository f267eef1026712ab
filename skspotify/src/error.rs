//! Error types for the Spotify side of Spotkov

use thiserror::Error;

/// Result type alias for skspotify
pub type Result<T> = std::result::Result<T, SpotifyError>;

#[derive(Error, Debug)]
pub enum SpotifyError {
    /// 401/403: expired token or missing playlist scopes
    #[error("Spotify rejected the access token: {0}")]
    TokenRejected(String),

    /// 404 on a user or playlist
    #[error("Spotify has no such user or playlist: {0}")]
    Missing(String),

    #[error("Request to the Spotify Web API failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected Spotify response body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Resolution cache I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Resolution cache is not valid bincode: {0}")]
    Codec(#[from] bincode::Error),

    #[error("Spotify settings are invalid: {0}")]
    Config(#[from] anyhow::Error),

    /// Any other non-2xx answer, with the message from the error envelope
    #[error("Spotify answered {status}: {message}")]
    Rejected { status: u16, message: String },

    /// 429
    #[error("Spotify is throttling requests")]
    Throttled,

    /// The generated playlist could not be written
    #[error("Couldn't write the playlist: {0}")]
    Publish(String),
}

impl SpotifyError {
    /// Classify a non-2xx answer of the Web API
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => Self::TokenRejected(message),
            404 => Self::Missing(message),
            429 => Self::Throttled,
            _ => Self::Rejected { status, message },
        }
    }

    /// The user has to provide a fresh token
    pub fn needs_new_token(&self) -> bool {
        matches!(self, Self::TokenRejected(_))
    }

    pub fn is_throttled(&self) -> bool {
        matches!(self, Self::Throttled)
    }
}
