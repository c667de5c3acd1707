use axum::Json;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde::Serialize;
use thiserror::Error;

use crate::db::DbError;

pub type AppResult<T> = core::result::Result<T, AppError>;

/// Failure taxonomy for the request surface. Duplicate completions and
/// repeated mark-read calls are success-shaped no-ops, not errors.
#[derive(Debug, Error)]
pub enum AppError {
    /// Referenced record does not exist, or is not owned by the caller.
    /// Ownership failures deliberately read as "not found" rather than
    /// "forbidden"; the predicate does not reveal foreign rows.
    #[error("{0} not found.")]
    NotFound(&'static str),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    InvalidState(String),

    #[error(transparent)]
    Database(#[from] DbError),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(DbError::from(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
        }

        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidArgument(_) | AppError::InvalidState(_) => StatusCode::BAD_REQUEST,
            AppError::Database(err) => {
                tracing::error!(error = ?err, "store failure inside route handler");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
        });

        (status, body).into_response()
    }
}
