use thiserror::Error;

#[derive(Error, Debug)]
pub enum GazetteError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl GazetteError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, GazetteError::Timeout(_))
    }
}

pub type Result<T> = std::result::Result<T, GazetteError>;
