use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid plant id")]
    InvalidId(String),

    #[error("Name, email and message are required")]
    MissingContactFields,

    #[error("User email is required")]
    MissingEmail,

    #[error("Update must set at least one field")]
    EmptyUpdate,

    #[error("Malformed payload")]
    MalformedPayload,

    #[error("Internal server error")]
    Store(#[from] StoreError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Store(source) => error!(error = %source, "Store operation failed"),
            AppError::InvalidId(id) => warn!(%id, "Rejected invalid plant id"),
            other => warn!(error = %other, "Rejected request"),
        }

        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
