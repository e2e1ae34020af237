use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use tracing::error;

/// Handler failures and the status each one maps to.
///
/// Client-facing variants carry a message for the response body. Database and
/// document-storage errors are logged server-side and answered with a generic
/// message.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(&'static str),
    Conflict(String),
    Unavailable(&'static str),
    Storage(anyhow::Error),
    Database(sqlx::Error),
}

impl ApiError {
    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub(crate) fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Storage(_) => StatusCode::BAD_GATEWAY,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            Self::BadRequest(message) | Self::Conflict(message) => message,
            Self::NotFound(message) | Self::Unavailable(message) => message.to_string(),
            Self::Storage(err) => {
                error!("Document storage error: {err:#}");
                "Document storage request failed".to_string()
            }
            Self::Database(err) => {
                error!("Database error: {err}");
                "Internal server error".to_string()
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap_or_default();
        let value = serde_json::from_slice(&bytes).unwrap_or_default();
        (status, value)
    }

    #[tokio::test]
    async fn client_errors_keep_their_message() {
        let (status, body) = body_of(ApiError::conflict("Trader already exists: ACME")).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "Trader already exists: ACME");

        let (status, body) = body_of(ApiError::NotFound("Incident not found")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Incident not found");
    }

    #[tokio::test]
    async fn server_errors_hide_details() {
        let (status, body) = body_of(ApiError::Database(sqlx::Error::RowNotFound)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");

        let (status, body) =
            body_of(ApiError::Storage(anyhow::anyhow!("token endpoint said no"))).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(!body["error"]
            .as_str()
            .unwrap_or_default()
            .contains("token"));
    }

    #[test]
    fn unavailable_is_503() {
        assert_eq!(
            ApiError::Unavailable("disabled").status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
