use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::board::BoardError;
use crate::store::StoreError;
use crate::toggle::ToggleError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    pub error: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    ServiceUnavailable(String),
    InternalServerError(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::BadRequest(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::ServiceUnavailable(msg)
            | ApiError::InternalServerError(msg) => msg,
        };

        let error_response = ErrorResponse {
            success: false,
            message,
            error: status.canonical_reason().map(str::to_string),
        };

        (status, Json(error_response)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(_) => ApiError::NotFound(e.to_string()),
            StoreError::Duplicate(_) => ApiError::Conflict(e.to_string()),
            StoreError::Unavailable(_) => ApiError::ServiceUnavailable(e.to_string()),
            StoreError::Corrupt { .. } => ApiError::InternalServerError(e.to_string()),
        }
    }
}

impl From<BoardError> for ApiError {
    fn from(e: BoardError) -> Self {
        match e {
            BoardError::EmptyName => ApiError::BadRequest(e.to_string()),
            BoardError::Store(e) => e.into(),
        }
    }
}

impl From<ToggleError> for ApiError {
    fn from(e: ToggleError) -> Self {
        match e {
            ToggleError::InProgress(_) => ApiError::Conflict(e.to_string()),
            ToggleError::UnknownDevice(_) => ApiError::NotFound(e.to_string()),
            ToggleError::Failed { .. } => ApiError::ServiceUnavailable(e.to_string()),
        }
    }
}
