use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

use crate::models::ErrorResponse;

/// Errors surfaced by the matching and status-transition core
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unknown status: {0}")]
    UnknownStatus(String),

    #[error("Unique constraint violated: {message}")]
    UniqueConstraintViolation {
        message: String,
        constraint: Option<String>,
        table: Option<String>,
    },

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Side effect failed: {0}")]
    SideEffectFailure(String),
}

impl AppError {
    /// Short machine-readable name used in error responses
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NotFound",
            AppError::Validation(_) => "ValidationError",
            AppError::UnknownStatus(_) => "UnknownStatus",
            AppError::UniqueConstraintViolation { .. } => "UniqueViolation",
            AppError::Persistence(_) => "PersistenceError",
            AppError::SideEffectFailure(_) => "SideEffectFailure",
        }
    }

    /// Unknown statuses are a kind of validation failure
    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::Validation(_) | AppError::UnknownStatus(_))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("no matching row".to_string()),
            sqlx::Error::Database(db_err) => {
                if db_err.is_unique_violation() {
                    AppError::UniqueConstraintViolation {
                        message: db_err.message().to_string(),
                        constraint: db_err.constraint().map(str::to_string),
                        table: db_err.table().map(str::to_string),
                    }
                } else if db_err.is_foreign_key_violation() || db_err.is_check_violation() {
                    AppError::Validation(db_err.message().to_string())
                } else {
                    AppError::Persistence(db_err.message().to_string())
                }
            }
            other => AppError::Persistence(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::Persistence(format!("migration failed: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) | AppError::UnknownStatus(_) => StatusCode::BAD_REQUEST,
            AppError::UniqueConstraintViolation { .. } => StatusCode::CONFLICT,
            AppError::Persistence(_) | AppError::SideEffectFailure(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        HttpResponse::build(status).json(ErrorResponse {
            error: self.kind().to_string(),
            message: self.to_string(),
            status_code: status.as_u16(),
        })
    }
}
