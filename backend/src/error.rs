use crate::database::DatabaseError;
use crate::fees::FeeError;
use crate::images::ImageStoreError;
use crate::ledger::{ErrorKind, LedgerError};
use sqlx::error::ErrorKind as SqlxErrorKind;
use sqlx::Error as SqlxError;
use thiserror::Error;

/// Application-level error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Repository errors outside a ledger transition
    #[error("Storage error: {0}")]
    Repository(#[from] RepositoryError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// State conflicts (occupied space, duplicate entry, ...)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Plate image cache errors
    #[error("Image store error: {0}")]
    ImageStore(#[from] ImageStoreError),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Message(String),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Check if error is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }

    /// Check if error is a conflict
    pub fn is_conflict(&self) -> bool {
        matches!(self, AppError::Conflict(_))
    }

    /// Get HTTP status code for the error
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::NotFound(_) => 404,
            AppError::Conflict(_) => 409,
            AppError::Validation(_) => 400,
            AppError::Serialization(_) => 400,
            AppError::Database(_) | AppError::Repository(_) => 503,
            AppError::ImageStore(_) => 503,
            _ => 500,
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match err.kind() {
            ErrorKind::NotFound => AppError::NotFound(message),
            ErrorKind::Conflict => AppError::Conflict(message),
            ErrorKind::InvalidInput => AppError::Validation(message),
            ErrorKind::Transient => match err {
                LedgerError::Storage(e) => AppError::Repository(e),
                _ => AppError::Message(message),
            },
        }
    }
}

impl From<FeeError> for AppError {
    fn from(err: FeeError) -> Self {
        AppError::Validation(err.to_string())
    }
}

/// Repository-specific error types
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Database query error
    #[error("Query error: {0}")]
    Query(SqlxError),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Duplicate record
    #[error("Duplicate record: {0}")]
    Duplicate(String),

    /// Constraint violation
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// A stored row does not decode into a model
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

impl From<SqlxError> for RepositoryError {
    fn from(err: SqlxError) -> Self {
        match &err {
            SqlxError::RowNotFound => RepositoryError::NotFound("Record not found".to_string()),
            SqlxError::Database(db_err) => match db_err.kind() {
                SqlxErrorKind::UniqueViolation => {
                    RepositoryError::Duplicate(db_err.message().to_string())
                }
                SqlxErrorKind::ForeignKeyViolation
                | SqlxErrorKind::NotNullViolation
                | SqlxErrorKind::CheckViolation => {
                    RepositoryError::ConstraintViolation(db_err.message().to_string())
                }
                _ => RepositoryError::Query(err),
            },
            _ => RepositoryError::Query(err),
        }
    }
}
