//! The authentication seam (§6a). Verifying who's calling is the
//! out-of-scope `AuthN` collaborator's job; it's expected to run ahead of
//! this router and insert a [`CallerIdentity`] request extension. Everything
//! here just reads that extension and enforces role requirements.

use axum::extract::{FromRequestParts, Request};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use common::error::ErrorResponse;
use common::ids::UserId;
use earnings_core::error::CoreError;
use earnings_core::models::Role;
use http::StatusCode;

/// The authenticated caller, inserted into request extensions upstream of
/// this router by the (out-of-scope) authentication layer.
#[derive(Clone, Debug)]
pub struct CallerIdentity {
    pub user_id: UserId,
    pub role: Role,
}

pub struct MissingCallerIdentity;

impl IntoResponse for MissingCallerIdentity {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            code: 0,
            msg: "missing caller identity; is the auth middleware installed?".to_string(),
            data: serde_json::Value::Null,
        };
        (StatusCode::UNAUTHORIZED, axum::Json(body)).into_response()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for CallerIdentity {
    type Rejection = MissingCallerIdentity;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .ok_or(MissingCallerIdentity)
    }
}

/// Tower/axum middleware factory: rejects the request with
/// [`CoreError::Forbidden`] unless the caller's role is `required`.
pub async fn require_role(
    required: Role,
    request: Request,
    next: Next,
) -> Response {
    match request.extensions().get::<CallerIdentity>() {
        Some(identity) if identity.role == required => next.run(request).await,
        Some(_) => core_error_response(&CoreError::Forbidden),
        None => MissingCallerIdentity.into_response(),
    }
}

fn core_error_response(err: &CoreError) -> Response {
    use common::error::ToHttpStatus;
    let status = err.to_http_status();
    let body = ErrorResponse::from(err);
    (status, axum::Json(body)).into_response()
}
