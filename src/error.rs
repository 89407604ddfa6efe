use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoteError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration missing: {0}")]
    ConfigurationMissing(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("Unknown model type: {0}")]
    UnknownModel(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl VoteError {
    /// True when the store rejected a write because the (voter, subject) pair
    /// already has a vote row.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            VoteError::Database(sqlx::Error::Database(e)) => e.is_unique_violation(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, VoteError>;
