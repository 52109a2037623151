use reqwest::StatusCode;
use thiserror::Error;

/// Everything that can go wrong between us and the GitHub API
///
/// Transport errors never leak out raw - they get folded into one of these
/// so the stores can show a sensible message and tests can match on variants.
/// Clone + PartialEq because the same failure may be handed to several waiters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("The request was invalid: {0}")]
    InvalidRequest(String),

    #[error("Unauthorized. Check your GitHub token.")]
    Unauthorized,

    #[error("API rate limit reached. Try again in a few minutes.")]
    RateLimited,

    #[error("The requested resource was not found")]
    NotFound,

    #[error("Validation failed, or the endpoint has been spammed.")]
    ValidationFailure,

    #[error("Server error ({0}). Please try again later.")]
    ServerError(u16),

    #[error("Failed to decode response: {0}")]
    DecodingFailure(String),

    #[error("Network error: {0}")]
    TransportFailure(String),

    #[error("No internet connection. Please check your network settings.")]
    NoConnectivity,
}

pub type Result<T> = std::result::Result<T, FetchError>;

impl FetchError {
    /// Map a non-success HTTP status onto the taxonomy
    ///
    /// Returns None for 2xx. GitHub answers 403 when the unauthenticated
    /// quota runs out, so it lands in RateLimited together with 429.
    pub fn from_status(status: StatusCode) -> Option<Self> {
        if status.is_success() {
            return None;
        }

        let err = match status.as_u16() {
            401 => FetchError::Unauthorized,
            403 | 429 => FetchError::RateLimited,
            404 => FetchError::NotFound,
            422 => FetchError::ValidationFailure,
            code @ 500..=599 => FetchError::ServerError(code),
            code => FetchError::InvalidRequest(format!("unexpected HTTP status {}", code)),
        };
        Some(err)
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::DecodingFailure(err.to_string())
        } else if err.is_connect() {
            FetchError::NoConnectivity
        } else if err.is_builder() {
            FetchError::InvalidRequest(err.to_string())
        } else if let Some(status) = err.status() {
            FetchError::from_status(status)
                .unwrap_or_else(|| FetchError::TransportFailure(err.to_string()))
        } else {
            FetchError::TransportFailure(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::DecodingFailure(err.to_string())
    }
}
