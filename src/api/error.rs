use crate::media::{EngineErrorKind, MediaError};
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{debug, error, warn};

#[derive(Debug, Serialize)]
struct ErrorBody {
    status: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_kind: Option<EngineErrorKind>,
}

/// A `MediaError` on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub MediaError);

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self.0 {
            MediaError::Validation(_) | MediaError::Engine { .. } => StatusCode::BAD_REQUEST,
            MediaError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<MediaError> for ApiError {
    fn from(error: MediaError) -> Self {
        Self(error)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(MediaError::validation(format!(
            "Invalid request body: {}",
            rejection.body_text()
        )))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self.0 {
            MediaError::Validation(message) => debug!("Rejected request: {}", message),
            MediaError::Engine { kind, message } => {
                warn!(error_kind = ?kind, "Request failed: {}", message)
            }
            MediaError::Unexpected(message) => error!("Unexpected error: {}", message),
        }

        let body = Json(ErrorBody {
            status: "error",
            error_kind: self.0.kind(),
            message: self.0.to_string(),
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let validation = ApiError(MediaError::validation("url is required"));
        assert_eq!(validation.status_code(), StatusCode::BAD_REQUEST);

        let engine = ApiError(MediaError::engine(EngineErrorKind::PrivateVideo, "Private video"));
        assert_eq!(engine.status_code(), StatusCode::BAD_REQUEST);

        let unexpected = ApiError(MediaError::unexpected("disk full"));
        assert_eq!(unexpected.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_error_body() {
        let response =
            ApiError(MediaError::engine(EngineErrorKind::MembersOnly, "members-only")).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "error");
        assert_eq!(body["error_kind"], "members_only");
        assert_eq!(body["message"], "This video is only available to channel members");
    }
}
