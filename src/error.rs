use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::validate::{FieldError, FieldErrors};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Validation(FieldErrors),

    #[error("invalid password")]
    InvalidPassword,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) | AppError::InvalidPassword => StatusCode::BAD_REQUEST,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<FieldErrors> for AppError {
    fn from(errors: FieldErrors) -> Self {
        AppError::Validation(errors)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if let AppError::Database(e) = &self {
            error!("Database error: {e}");
        }

        let fields: &[FieldError] = match &self {
            AppError::Validation(errors) => errors.as_slice(),
            _ => &[],
        };

        let body = json!({
            "error": self.to_string(),
            "fields": fields,
        });

        (status, Json(body)).into_response()
    }
}

/// Maps a missing row on a single-record lookup to [`AppError::NotFound`].
/// Every other storage error passes through untouched.
pub fn not_found_as(what: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| match e {
        sqlx::Error::RowNotFound => AppError::NotFound(what),
        other => AppError::Database(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::FieldErrors;

    #[test]
    fn statuses_follow_error_kind() {
        assert_eq!(AppError::NotFound("space").status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::InvalidPassword.status(), StatusCode::BAD_REQUEST);

        let mut errors = FieldErrors::default();
        errors.push("text", "is required");
        assert_eq!(AppError::from(errors).status(), StatusCode::BAD_REQUEST);

        let db = AppError::from(sqlx::Error::PoolClosed);
        assert_eq!(db.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn only_row_not_found_becomes_not_found() {
        let missing = not_found_as("space")(sqlx::Error::RowNotFound);
        assert!(matches!(missing, AppError::NotFound("space")));

        let closed = not_found_as("space")(sqlx::Error::PoolClosed);
        assert!(matches!(closed, AppError::Database(sqlx::Error::PoolClosed)));
    }
}
