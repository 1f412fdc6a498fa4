//! Error bodies shared by the REST handlers.

use axum::{http::StatusCode, Json};
use serde::Serialize;

use mediaq_core::ServiceError;

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Status code for a core error.
pub fn status_for(error: &ServiceError) -> StatusCode {
    if error.is_not_found() {
        StatusCode::NOT_FOUND
    } else if error.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

pub fn service_error(error: ServiceError) -> ApiError {
    (
        status_for(&error),
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
}

pub fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}
