//! HTTP error response handling for the API
//!
//! Converts run-level errors into HTTP responses with a status code and a
//! JSON error body. Row-level failures never reach this module; they travel
//! as event text inside a run's stream.

use crate::error::{ApiError, Error, ToHttpStatus};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let api_error: ApiError = self.into();

        (status_code, Json(api_error)).into_response()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // without an Error there is no better status to pick
        (StatusCode::INTERNAL_SERVER_ERROR, Json(self)).into_response()
    }
}
