//! Mapping of crate errors onto HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::error::SplitbookError;
use crate::validation::ValidationError;

/// Error returned by every handler, rendered as `{"error": "<message>"}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A store, validation or upstream failure.
    #[error(transparent)]
    Store(#[from] SplitbookError),

    /// The addressed record does not exist.
    #[error("{0}")]
    NotFound(String),
}

impl From<ValidationError> for ApiError {
    #[inline]
    fn from(err: ValidationError) -> Self {
        Self::Store(SplitbookError::Validation(err))
    }
}

impl ApiError {
    /// HTTP status this error is reported with.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match *self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Store(ref err) => match *err {
                SplitbookError::Validation(_) => StatusCode::BAD_REQUEST,
                SplitbookError::Api { .. } => StatusCode::BAD_GATEWAY,
                #[cfg(any(feature = "async", feature = "blocking"))]
                SplitbookError::Http(_) => StatusCode::BAD_GATEWAY,
                SplitbookError::StorageUnavailable(_)
                | SplitbookError::SeedUnavailable(_)
                | SplitbookError::Serialization(_)
                | SplitbookError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    #[inline]
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
