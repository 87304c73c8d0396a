use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered, but with a failure status or a failure envelope.
    #[error("{message}")]
    Remote { status: Option<u16>, message: String },

    #[error("Failed to deserialize the API response: {0}")]
    Deserialization(String),

    #[error("Invalid data format from API: {0}")]
    InvalidData(String),

    #[error("Invalid service URL: {0}")]
    InvalidUrl(String),

    /// Reading or writing the persisted cookie jar failed.
    #[error("Session file error: {0}")]
    Session(String),
}

impl ApiError {
    pub(crate) fn remote(status: Option<u16>, message: impl Into<String>) -> Self {
        ApiError::Remote {
            status,
            message: message.into(),
        }
    }
}
