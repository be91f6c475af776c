use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    // Configuration errors
    #[error("Invalid config: {message}")]
    ConfigInvalid { message: String },

    #[error("Missing required config field: {field}")]
    ConfigMissingField { field: String },

    #[error("Failed to parse config file: {0}")]
    ConfigParseError(#[from] toml::de::Error),

    // Input validation errors
    #[error("Input is empty")]
    EmptyInput,

    #[error("No track identifier found in link: {link}")]
    InvalidLink { link: String },

    #[error("Invalid track identifier: {id:?}")]
    InvalidTrackId { id: String },

    #[error("No search result at position {index}")]
    NoSuchResult { index: usize },

    // Lookup errors
    #[error("Lookup backend {backend} failed: {reason}")]
    LookupFailed { backend: String, reason: String },

    // Widget errors
    #[error("Player has no container; call initialize first")]
    PlayerNotInitialized,

    #[error("Widget creation failed: {reason}")]
    WidgetCreation { reason: String },

    // Network errors
    #[error("Network request failed: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Network middleware failed: {0}")]
    MiddlewareError(#[from] reqwest_middleware::Error),

    // IO errors
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl CoreError {
    /// Whether the error was caused by caller input rather than an upstream failure.
    #[must_use]
    pub const fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::EmptyInput
                | Self::InvalidLink { .. }
                | Self::InvalidTrackId { .. }
                | Self::NoSuchResult { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
