use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::db::DbError;

#[derive(Debug, Error)]
pub enum GalleryError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Background task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),

    #[error("File type not allowed: {0}")]
    DisallowedExtension(String),

    #[error("File is {size} bytes, limit is {limit}")]
    FileTooLarge { size: usize, limit: usize },

    #[error("Upload form error: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),

    #[error("Not found")]
    NotFound,
}

impl IntoResponse for GalleryError {
    fn into_response(self) -> Response {
        match self {
            GalleryError::NotFound => (StatusCode::NOT_FOUND, "Not found").into_response(),
            GalleryError::DisallowedExtension(_)
            | GalleryError::FileTooLarge { .. }
            | GalleryError::Multipart(_) => {
                (StatusCode::BAD_REQUEST, self.to_string()).into_response()
            }
            other => {
                error!("Gallery request failed: {}", other);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}
