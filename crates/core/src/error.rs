// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Persistence error: {0}")]
    Persistence(#[from] crate::application::persistence::PersistenceError),

    #[error("{description} failed after {attempts} attempt(s): {message}")]
    RetryExhausted {
        description: String,
        attempts: u32,
        message: String,
    },

    #[error("{description} cancelled after {attempts} attempt(s)")]
    Cancelled { description: String, attempts: u32 },
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

impl<E> From<crate::application::retry::RetryError<E>> for AppError
where
    E: std::error::Error + 'static,
{
    fn from(err: crate::application::retry::RetryError<E>) -> Self {
        use crate::application::retry::RetryError;
        match err {
            RetryError::Exhausted {
                description,
                attempts,
                last_error,
            } => AppError::RetryExhausted {
                description,
                attempts,
                message: last_error.to_string(),
            },
            RetryError::Cancelled {
                description,
                attempts,
            } => AppError::Cancelled {
                description,
                attempts,
            },
        }
    }
}
