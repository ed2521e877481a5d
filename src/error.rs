use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

use crate::users::{dto::Envelope, fields::UserField};

/// Failures reported by a storage executor.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("unique constraint violated")]
    UniqueViolation,
    #[error("database error: {0}")]
    Sqlx(sqlx::Error),
    #[error("malformed statement: {0}")]
    Malformed(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        let unique = e
            .as_database_error()
            .map(|db| db.is_unique_violation())
            .unwrap_or(false);
        if unique {
            StoreError::UniqueViolation
        } else {
            StoreError::Sqlx(e)
        }
    }
}

#[derive(Error, Debug)]
pub enum AccountError {
    #[error("Failed to validate user: {0}")]
    Validation(String),
    #[error("Failed to read field {0}")]
    Mapping(UserField),
    #[error("User is not unique")]
    NotUnique,
    #[error("User not found")]
    NotFound,
    #[error("You do not have permission to {0} this user")]
    PermissionDenied(&'static str),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Failed to process password: {0}")]
    Credential(String),
    #[error("Invalid token: {0}")]
    Token(String),
    #[error("Failed to check user uniqueness: {0}")]
    UniquenessCheck(StoreError),
    #[error("Storage failure: {0}")]
    Storage(StoreError),
    #[error("Failed to retrieve {0} user")]
    Refetch(&'static str),
}

impl From<StoreError> for AccountError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::UniqueViolation => AccountError::NotUnique,
            other => AccountError::Storage(other),
        }
    }
}

impl From<JsonRejection> for AccountError {
    fn from(e: JsonRejection) -> Self {
        AccountError::Validation(e.body_text())
    }
}

impl From<PathRejection> for AccountError {
    fn from(e: PathRejection) -> Self {
        AccountError::Validation(e.body_text())
    }
}

impl From<QueryRejection> for AccountError {
    fn from(e: QueryRejection) -> Self {
        AccountError::Validation(e.body_text())
    }
}

impl AccountError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AccountError::Validation(_) | AccountError::Mapping(_) => StatusCode::BAD_REQUEST,
            AccountError::NotUnique => StatusCode::CONFLICT,
            AccountError::NotFound => StatusCode::NOT_FOUND,
            AccountError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            AccountError::InvalidCredentials | AccountError::Token(_) => StatusCode::UNAUTHORIZED,
            AccountError::Credential(_)
            | AccountError::UniquenessCheck(_)
            | AccountError::Storage(_)
            | AccountError::Refetch(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AccountError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        (status, Json(Envelope::error(self.to_string()))).into_response()
    }
}
