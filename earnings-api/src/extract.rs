//! A thin [`axum::Json`] wrapper so every success response goes through one
//! code path (§6a), the way the teacher's `LxJson` keeps success and error
//! serialization consistent across the whole API surface.

use axum::extract::{FromRequest, Request};
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde::Serialize;

pub struct LxJson<T>(pub T);

impl<T, S> FromRequest<S> for LxJson<T>
where
    T: serde::de::DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = crate::error::ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let axum::Json(value) = axum::Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| {
                crate::error::ApiError::from(earnings_core::error::CoreError::InvalidInput {
                    field: "body".to_string(),
                    reason: rejection.to_string(),
                })
            })?;
        Ok(Self(value))
    }
}

impl<T: Serialize> IntoResponse for LxJson<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, axum::Json(self.0)).into_response()
    }
}
