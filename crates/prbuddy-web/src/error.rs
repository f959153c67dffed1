//! Maps `DaemonError` onto the HTTP status codes in the external
//! interface table: `InputError` -> 400, `NotFound` -> 404, every
//! other kind -> 500. Body shape is always `{"error": "<message>"}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use prbuddy_daemon::DaemonError;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum WebError {
    #[error(transparent)]
    Daemon(#[from] DaemonError),
    #[error("{0}")]
    BadRequest(String),
}

impl WebError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        WebError::BadRequest(message.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            WebError::BadRequest(_) => StatusCode::BAD_REQUEST,
            WebError::Daemon(DaemonError::InputError { .. }) => StatusCode::BAD_REQUEST,
            WebError::Daemon(DaemonError::NotFound { .. }) => StatusCode::NOT_FOUND,
            WebError::Daemon(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_error_maps_to_400() {
        let err = WebError::Daemon(DaemonError::input("empty"));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn not_found_maps_to_404() {
        let err = WebError::Daemon(DaemonError::not_found("draft"));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn state_error_maps_to_500() {
        let err = WebError::Daemon(DaemonError::state("no conversation"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
