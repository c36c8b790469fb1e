//! Error handling for siteloader

use thiserror::Error;

/// Result alias used throughout the extractors
pub type Result<T> = std::result::Result<T, ExtractError>;

/// Main error type for extraction
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The page told us the content is gone (removed album, unknown profile, ...)
    #[error("{message}")]
    NotFound { id: String, message: String },

    /// The page was fetched but no playable media could be located
    #[error("{id}: {message}")]
    NoMedia { id: String, message: String },

    /// The remote API answered with an explicit error payload
    #[error("{id}: {site} said: {message}")]
    Api {
        id: String,
        site: &'static str,
        message: String,
    },

    #[error("{0}")]
    InvalidInput(String),

    #[error("Unsupported URL: {0}")]
    Unsupported(String),

    #[error("Unable to get temporary token")]
    Token,

    #[error("HTTP error {status} for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl ExtractError {
    /// Whether this failure should be shown to the user as a plain message
    /// rather than treated as a bug or transport problem.
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            ExtractError::NotFound { .. }
                | ExtractError::NoMedia { .. }
                | ExtractError::Api { .. }
                | ExtractError::InvalidInput(_)
                | ExtractError::Unsupported(_)
        )
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            ExtractError::HttpStatus { status, .. } => Some(*status),
            ExtractError::NetworkError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub(crate) fn not_found(id: impl Into<String>, message: impl Into<String>) -> Self {
        ExtractError::NotFound {
            id: id.into(),
            message: message.into(),
        }
    }

    pub(crate) fn no_media(id: impl Into<String>, message: impl Into<String>) -> Self {
        ExtractError::NoMedia {
            id: id.into(),
            message: message.into(),
        }
    }
}
