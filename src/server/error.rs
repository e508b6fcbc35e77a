//! Mapping of facade errors onto HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::error::ContainerError;

/// JSON body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable, machine-readable code.
    pub error: String,
    /// Human-readable message.
    pub detail: String,
}

/// An error as seen by HTTP clients.
#[derive(Debug)]
pub enum ApiError {
    /// The facade refused or failed the operation.
    Container(ContainerError),
    /// The request could not be parsed.
    InvalidRequest(String),
}

impl ApiError {
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Container(err) => match err {
                ContainerError::Rejected(_) => StatusCode::BAD_REQUEST,
                ContainerError::NotFound { .. } | ContainerError::ImageNotFound { .. } => {
                    StatusCode::NOT_FOUND
                }
                ContainerError::NotManaged { .. } => StatusCode::FORBIDDEN,
                ContainerError::Runtime { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid-request",
            Self::Container(err) => err.code(),
        }
    }

    /// Client-facing message. Runtime failures name the operation only; the
    /// underlying runtime message stays in the logs.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::InvalidRequest(message) => format!("Invalid request: {message}"),
            Self::Container(err) => err.to_string(),
        }
    }
}

impl From<ContainerError> for ApiError {
    fn from(err: ContainerError) -> Self {
        Self::Container(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.code().to_string(),
            detail: self.detail(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Rejection, RuntimeError};

    #[test]
    fn test_status_codes() {
        let rejected: ApiError = ContainerError::from(Rejection::ImageNotAllowed {
            image: "busybox".into(),
        })
        .into();
        assert_eq!(rejected.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(rejected.code(), "image-not-allowed");

        let missing: ApiError = ContainerError::NotFound { id: "abc".into() }.into();
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);

        let foreign: ApiError = ContainerError::NotManaged { id: "abc".into() }.into();
        assert_eq!(foreign.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(foreign.code(), "resource-not-managed");

        let image: ApiError = ContainerError::ImageNotFound {
            image: "nope".into(),
        }
        .into();
        assert_eq!(image.status_code(), StatusCode::NOT_FOUND);

        assert_eq!(
            ApiError::InvalidRequest("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_runtime_detail_hides_runtime_message() {
        let err: ApiError = ContainerError::runtime(
            "start",
            "abc",
            RuntimeError::Api("500: driver failed on /var/lib/docker/overlay2".into()),
        )
        .into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "runtime-error");
        assert_eq!(err.detail(), "Failed to start container 'abc'");
    }
}
