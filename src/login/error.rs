use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;
use tracing::error;

use crate::db::DbError;

#[derive(Debug)]
pub enum LoginError {
    CredentialMissing,
    DatabaseError(String),
    HashError(String),
    InternalError(String),
}

impl fmt::Display for LoginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoginError::CredentialMissing => write!(f, "No admin credential is stored"),
            LoginError::DatabaseError(e) => write!(f, "Database error: {}", e),
            LoginError::HashError(e) => write!(f, "Password hashing error: {}", e),
            LoginError::InternalError(e) => write!(f, "Internal error: {}", e),
        }
    }
}

impl std::error::Error for LoginError {}

impl From<DbError> for LoginError {
    fn from(e: DbError) -> Self {
        LoginError::DatabaseError(e.to_string())
    }
}

impl From<bcrypt::BcryptError> for LoginError {
    fn from(e: bcrypt::BcryptError) -> Self {
        LoginError::HashError(e.to_string())
    }
}

impl From<tokio::task::JoinError> for LoginError {
    fn from(e: tokio::task::JoinError) -> Self {
        LoginError::InternalError(e.to_string())
    }
}

impl IntoResponse for LoginError {
    fn into_response(self) -> Response {
        error!("Login request failed: {}", self);
        let message = match self {
            LoginError::CredentialMissing => "Admin account is not configured",
            LoginError::DatabaseError(_) => "Database error",
            LoginError::HashError(_) | LoginError::InternalError(_) => "Internal server error",
        };

        (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
    }
}
