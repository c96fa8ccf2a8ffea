use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    MissingFile(&'static str),

    #[error("Invalid multipart body: {}", .0.body_text())]
    Multipart(#[from] MultipartError),

    #[error(transparent)]
    Ingest(#[from] ingest::IngestError),

    #[error(transparent)]
    Extract(#[from] extract::ExtractError),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingFile(_) => StatusCode::BAD_REQUEST,
            Self::Multipart(e) => e.status(),
            Self::Ingest(_) | Self::Extract(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            status: "Error",
            message: self.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}
