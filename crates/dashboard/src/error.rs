use crate::validation::ValidationError;
use api_client::error::ApiError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A whole-list load failed; the message is what the table shows instead.
    #[error("{0}")]
    Load(String),

    #[error("Not authenticated. Log in first or configure credentials.")]
    NotAuthenticated,

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Column settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Column settings are not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
