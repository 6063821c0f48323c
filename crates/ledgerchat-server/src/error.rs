use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use ledgerchat_store::StoreError;
use ledgerchat_stream::StreamError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Ledger gateway not initialized")]
    GatewayUnavailable,

    #[error("{0}")]
    Upstream(String),

    #[error("{0}")]
    Timeout(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ServerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(msg) => ServerError::BadRequest(msg),
            StoreError::NotFound(_) => ServerError::NotFound(err.to_string()),
            other => ServerError::Internal(other.to_string()),
        }
    }
}

impl From<StreamError> for ServerError {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::InvalidInput(msg) => ServerError::BadRequest(msg),
            StreamError::Encoding(e) => ServerError::BadRequest(e.to_string()),
            StreamError::Unauthenticated => ServerError::Unauthorized(err.to_string()),
            StreamError::NotPublished | StreamError::Gateway(_) => {
                ServerError::Upstream(err.to_string())
            }
            StreamError::ConfirmationTimeout(_) => ServerError::Timeout(err.to_string()),
            StreamError::NoRuntime => ServerError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ServerError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ServerError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, self.to_string()),
            ServerError::GatewayUnavailable => {
                (StatusCode::SERVICE_UNAVAILABLE, self.to_string())
            }
            ServerError::Upstream(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            ServerError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, self.to_string()),
            ServerError::Internal(detail) => {
                tracing::error!(error = %detail, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}
