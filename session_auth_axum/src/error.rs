use std::any::Any;

use axum::Json;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde::Serialize;
use serde_json::{Value, json};

use session_auth::{AuthError, SessionError};

const INTERNAL_SERVER_ERROR_DETAIL: &str = "Internal Server Error";

/// An error on its way to becoming a client-visible response.
///
/// Renders as `{"status_code": .., "detail": .., "extra": ..}`.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpError {
    pub status: StatusCode,
    pub detail: String,
    pub extra: Option<Value>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    status_code: u16,
    detail: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    extra: Option<&'a Value>,
}

impl HttpError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
            extra: None,
        }
    }

    pub fn with_extra(mut self, extra: Value) -> Self {
        self.extra = Some(extra);
        self
    }

    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, detail)
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, detail)
    }

    /// Rejections keep their reason. Faults are reduced to a generic
    /// message unless `debug` is set.
    pub fn from_auth_error(err: &AuthError, debug: bool) -> Self {
        let status = err.status_code();
        if status.is_client_error() {
            return Self::new(status, err.to_string());
        }

        tracing::error!("Request failed: {err}");
        if debug {
            Self::new(status, err.to_string()).with_extra(json!({ "debug": format!("{err:?}") }))
        } else {
            Self::new(status, INTERNAL_SERVER_ERROR_DETAIL)
        }
    }

    pub fn from_session_error(err: SessionError, debug: bool) -> Self {
        Self::from_auth_error(&AuthError::Session(err), debug)
    }

    /// Translate a panic payload caught below the translator
    pub fn from_panic(payload: Box<dyn Any + Send>, debug: bool) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());

        tracing::error!("Handler panicked: {message}");
        if debug {
            Self::internal(format!("panic: {message}")).with_extra(json!({ "panic": message }))
        } else {
            Self::internal(INTERNAL_SERVER_ERROR_DETAIL)
        }
    }

    pub fn is_server_error(&self) -> bool {
        self.status.is_server_error()
    }
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status, self.detail)
    }
}

impl std::error::Error for HttpError {}

impl From<&AuthError> for HttpError {
    fn from(err: &AuthError) -> Self {
        Self::from_auth_error(err, false)
    }
}

impl IntoResponse for HttpError {
    /// The rendered response keeps a copy of the error in its extensions so
    /// the exception handler layer can route it through the app's registry.
    fn into_response(self) -> Response {
        let body = ErrorBody {
            status_code: self.status.as_u16(),
            detail: &self.detail,
            extra: self.extra.as_ref(),
        };
        let mut response = (self.status, Json(body)).into_response();
        response.extensions_mut().insert(self);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_rejection_keeps_reason() {
        let err = AuthError::not_authorized("no session data found");

        let http_error = HttpError::from_auth_error(&err, false);

        assert_eq!(http_error.status, StatusCode::UNAUTHORIZED);
        assert_eq!(http_error.detail, "no session data found");
        assert!(http_error.extra.is_none());
    }

    #[test]
    fn test_fault_is_generic_without_debug() {
        let err = AuthError::Internal("database password is hunter2".to_string());

        let http_error = HttpError::from_auth_error(&err, false);

        assert_eq!(http_error.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(http_error.detail, "Internal Server Error");
        assert!(http_error.extra.is_none());
    }

    #[test]
    fn test_fault_carries_detail_in_debug() {
        let err = AuthError::Internal("boom".to_string());

        let http_error = HttpError::from_auth_error(&err, true);

        assert_eq!(http_error.detail, "Internal error: boom");
        assert!(http_error.extra.unwrap()["debug"].as_str().unwrap().contains("Internal"));
    }

    #[test]
    fn test_panic_payloads() {
        let from_str = HttpError::from_panic(Box::new("static message"), true);
        let from_string = HttpError::from_panic(Box::new("owned".to_string()), true);
        let opaque = HttpError::from_panic(Box::new(42u8), false);

        assert_eq!(from_str.detail, "panic: static message");
        assert_eq!(from_string.detail, "panic: owned");
        assert_eq!(opaque.detail, "Internal Server Error");
    }

    #[tokio::test]
    async fn test_response_body_shape() {
        let response = HttpError::unauthorized("nope").into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            body_json(response).await,
            json!({ "status_code": 401, "detail": "nope" })
        );
    }

    #[test]
    fn test_response_carries_error_extension() {
        let response = HttpError::unauthorized("nope").into_response();

        assert_eq!(
            response.extensions().get::<HttpError>(),
            Some(&HttpError::unauthorized("nope"))
        );
    }

    #[tokio::test]
    async fn test_response_body_with_extra() {
        let response = HttpError::internal("x")
            .with_extra(json!({ "k": "v" }))
            .into_response();

        assert_eq!(
            body_json(response).await,
            json!({ "status_code": 500, "detail": "x", "extra": { "k": "v" } })
        );
    }
}
