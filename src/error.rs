// PromptShelf — Library error type

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShelfError {
    #[error("no prompt, group or category with id '{0}'")]
    NotFound(String),
    #[error("'{0}' belongs to a system category and cannot be modified")]
    ReadOnly(String),
    #[error("'{0}' is a system prompt and cannot be shared")]
    NotShareable(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The user dismissed an interactive step. Not a failure.
    #[error("cancelled")]
    Cancelled,
    #[error("file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
    #[error("{0}")]
    Other(String),
}

impl ShelfError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ShelfError::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, ShelfError>;
