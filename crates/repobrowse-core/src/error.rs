use repobrowse_api::FetchError;
use thiserror::Error;

/// All the ways things can go wrong in RepoBrowse
///
/// We use thiserror here because it generates the boilerplate for us.
/// Life's too short to manually implement Display and Error traits.
#[derive(Error, Debug)]
pub enum Error {
    /// Anything the GitHub side reported, already classified
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<repobrowse_cache::StoreError> for Error {
    fn from(err: repobrowse_cache::StoreError) -> Self {
        Error::Persistence(err.to_string())
    }
}

impl Error {
    /// The underlying fetch failure, if this was one
    pub fn as_fetch(&self) -> Option<&FetchError> {
        match self {
            Error::Fetch(err) => Some(err),
            _ => None,
        }
    }
}
