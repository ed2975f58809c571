//! HTTP error response mapping.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use thermotwin_domain::error::TwinError;

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: String,
    status_code: u16,
}

/// Maps [`TwinError`] and request rejections to an HTTP response.
#[derive(Debug)]
pub enum ApiError {
    /// The request body could not be decoded.
    BadRequest(String),
    /// The application layer refused or failed the call.
    Twin(TwinError),
}

impl From<TwinError> for ApiError {
    fn from(err: TwinError) -> Self {
        Self::Twin(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Twin(TwinError::Validation(_)) => StatusCode::BAD_REQUEST,
            Self::Twin(TwinError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Twin(TwinError::Stale(_)) => StatusCode::CONFLICT,
            Self::Twin(TwinError::Storage(_) | TwinError::Publish(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
            format!(
                "{}: {}",
                status.canonical_reason().unwrap_or("Error"),
                status.as_u16()
            )
        } else {
            match self {
                Self::BadRequest(message) => message,
                Self::Twin(err) => match err {
                    TwinError::Validation(inner) => inner.to_string(),
                    TwinError::NotFound(inner) => inner.to_string(),
                    TwinError::Stale(inner) => inner.to_string(),
                    other => other.to_string(),
                },
            }
        };

        let body = ErrorBody {
            error,
            status_code: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}
