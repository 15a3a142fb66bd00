//! Wires [`CoreError`] into axum's [`IntoResponse`], mirroring the
//! teacher's `log_and_status`: server errors are logged at `error!`, client
//! errors at `warn!`, and every response carries the common
//! [`ErrorResponse`] envelope.

use axum::response::{IntoResponse, Response};
use common::error::{ErrorResponse, ToHttpStatus};
use earnings_core::error::CoreError;
use http::StatusCode;

pub struct ApiError(pub CoreError);

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.0.to_http_status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "internal error handling request");
        } else {
            tracing::warn!(error = %self.0, "request rejected");
        }
        let body = ErrorResponse::from(&self.0);
        (status, axum::Json(body)).into_response()
    }
}

/// The status code for unmatched routes, mirroring the teacher's default
/// fallback handler.
pub async fn not_found_fallback() -> impl IntoResponse {
    let body = ErrorResponse {
        code: 0,
        msg: "no route matches this method/path".to_string(),
        data: serde_json::Value::Null,
    };
    (StatusCode::NOT_FOUND, axum::Json(body))
}
