//! The common wire representation for API errors, shared by every crate that
//! sits on the HTTP boundary. Domain-specific error enums (e.g.
//! `earnings_core::error::CoreError`) convert to and from [`ErrorResponse`]
//! rather than being serialized directly.

use http::StatusCode;
use serde::{Deserialize, Serialize};

/// The stable, serializable code for an error kind. Small and int-typed so
/// SDKs/tests can match on it without string comparison.
pub type ErrorCode = u16;

/// The only error struct actually sent across the wire. Every domain error
/// type converts to/from this before it touches JSON.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub msg: String,
    /// Structured, variant-specific context (e.g. the offending field, the
    /// current balance). `Value::Null` when a variant carries none.
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Maps an error type onto the HTTP status code it should be reported with.
pub trait ToHttpStatus {
    fn to_http_status(&self) -> StatusCode;
}
