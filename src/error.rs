use thiserror::Error as ThisError;

#[derive(ThisError, Debug, Clone, PartialEq)]
pub enum AppError {
    /// Network failure or non-success status from an external API
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Series too short for the configured indicator windows
    #[error("Insufficient history: need {required} samples, got {available}")]
    InsufficientHistory { required: usize, available: usize },

    /// HTTP 429 from the price API (retried once before surfacing)
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Payload did not have the expected shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl AppError {
    /// True for errors worth one more attempt after a backoff
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, AppError::RateLimited)
    }
}

impl From<tokio::io::Error> for AppError {
    fn from(err: tokio::io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AppError::MalformedResponse(err.to_string())
        } else if err.status().map(|s| s.as_u16()) == Some(429) {
            AppError::RateLimited
        } else {
            AppError::UpstreamUnavailable(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::MalformedResponse(format!("JSON error: {}", err))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

// Alias for convenience
pub type Error = AppError;
