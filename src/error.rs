use thiserror::Error;

use crate::{
    models::Destination,
    response::{Severity, Toast},
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("An account with this email already exists.")]
    DuplicateEmail,

    #[error("This email is already in use by another account.")]
    EmailInUse,

    #[error("\"{0}\" is no longer available.")]
    Unavailable(String),

    #[error("Your data changed elsewhere. Please reload.")]
    StaleSnapshot,

    #[error("{message}")]
    LoginRequired {
        message: String,
        resume: Destination,
    },

    #[error("Your session has expired. Please log in again.")]
    SessionExpired,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Invalid email or password.")]
    InvalidCredentials,

    #[error("Incorrect current password.")]
    WrongPassword,

    #[error("{0}")]
    NotEligible(String),

    #[error("Storage error")]
    Storage(#[from] sea_orm::DbErr),

    #[error("Database error")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt stored data")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error")]
    Internal(#[from] anyhow::Error),
}

/// Error classes surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    Authorization,
    NotFound,
    IncorrectCredential,
    Internal,
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation(_) | AppError::NotEligible(_) => ErrorKind::Validation,
            AppError::DuplicateEmail
            | AppError::EmailInUse
            | AppError::Unavailable(_)
            | AppError::StaleSnapshot => ErrorKind::Conflict,
            AppError::LoginRequired { .. } => ErrorKind::Authorization,
            AppError::SessionExpired | AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::InvalidCredentials | AppError::WrongPassword => {
                ErrorKind::IncorrectCredential
            }
            AppError::Storage(_)
            | AppError::Database(_)
            | AppError::Serialization(_)
            | AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    /// The toast shown to the user for this failure.
    pub fn toast(&self) -> Toast {
        let message = match self.kind() {
            ErrorKind::Internal => "An error occurred. Please try again.".to_string(),
            _ => self.to_string(),
        };
        Toast {
            message,
            severity: Severity::Error,
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
