//! Error types for SubDash

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SubdashError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for SubdashError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => SubdashError::NotFound("row".to_string()),
            other => SubdashError::Database(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for SubdashError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        SubdashError::Database(err.to_string())
    }
}

pub type SubdashResult<T> = Result<T, SubdashError>;
