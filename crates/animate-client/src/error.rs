//! Client error types.

/// Errors that can occur when using the animate client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server returned an error response.
    #[error("API error: {code} - {message}")]
    Api {
        /// Error code.
        code: String,
        /// Error message.
        message: String,
        /// HTTP status code.
        status: u16,
    },

    /// The user's generation quota is used up.
    #[error("quota exceeded: {message}")]
    QuotaExceeded {
        /// Denial reason, naming the reset date.
        message: String,
    },

    /// The requested length or resolution is above the user's tier.
    #[error("tier restricted: {message}")]
    TierRestricted {
        /// Denial reason.
        message: String,
        /// Tier and maximum allowed setting, as sent by the server.
        details: Option<serde_json::Value>,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}
