//! API error types with HTTP response mapping.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use saga::OrderingError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed request: bad JSON body, bad path parameter.
    BadRequest(String),
    /// Caller identity headers are missing or invalid.
    Unauthorized(String),
    /// Error raised by the order saga.
    Ordering(OrderingError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Ordering(err) => ordering_status(err),
        }
    }
}

fn ordering_status(err: &OrderingError) -> StatusCode {
    match err {
        OrderingError::Validation(_) => StatusCode::BAD_REQUEST,
        OrderingError::NotFound(_) => StatusCode::NOT_FOUND,
        OrderingError::Conflict(_) => StatusCode::CONFLICT,
        OrderingError::Forbidden(_) => StatusCode::FORBIDDEN,
        OrderingError::Dependency(_) => StatusCode::BAD_GATEWAY,
        OrderingError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
        OrderingError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::BadRequest(msg) | ApiError::Unauthorized(msg) => msg,
            ApiError::Ordering(err) => {
                if status.is_server_error() {
                    tracing::error!(kind = err.kind(), error = %err, "request failed");
                }
                err.to_string()
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

impl From<OrderingError> for ApiError {
    fn from(err: OrderingError) -> Self {
        ApiError::Ordering(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_error_status_codes() {
        let cases = [
            (OrderingError::Validation("v".into()), StatusCode::BAD_REQUEST),
            (OrderingError::NotFound("n".into()), StatusCode::NOT_FOUND),
            (OrderingError::Conflict("c".into()), StatusCode::CONFLICT),
            (OrderingError::Forbidden("f".into()), StatusCode::FORBIDDEN),
            (OrderingError::Dependency("d".into()), StatusCode::BAD_GATEWAY),
            (OrderingError::Transient("t".into()), StatusCode::SERVICE_UNAVAILABLE),
            (OrderingError::Internal("i".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status(), expected);
        }
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let response = ApiError::BadRequest("bad order id".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, serde_json::json!({"error": "bad order id"}));
    }
}
