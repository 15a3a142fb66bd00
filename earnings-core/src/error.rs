//! The domain error taxonomy of §7. A single enum rather than the teacher's
//! macro-generated `ApiErrorKind` machinery, since this crate has a fixed,
//! small set of failure modes instead of an extensible API surface shared
//! across many services.

use common::error::{ErrorResponse, ToHttpStatus};
use common::ids::{OrderId, PayoutId, UserId};
use common::money::Money;
use http::StatusCode;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("user {user} not found")]
    UserNotFound { user: UserId },

    #[error("order {order} not found")]
    OrderNotFound { order: OrderId },

    #[error("order {order} has already been delivered")]
    OrderAlreadyDelivered { order: OrderId },

    #[error("payout {payout} not found")]
    PayoutNotFound { payout: PayoutId },

    #[error("wallet for user {user} holds {balance} but {requested} was requested")]
    InsufficientFunds {
        user: UserId,
        balance: Money,
        requested: Money,
    },

    #[error("rider {rider} is payment-blocked: {reason}")]
    RiderPaymentBlocked { rider: UserId, reason: String },

    #[error("rider {rider}'s account has been deactivated: {reason}")]
    RiderDeactivated { rider: UserId, reason: String },

    #[error("referral code {code:?} is unknown")]
    UnknownReferralCode { code: String },

    #[error("a rider cannot refer themselves")]
    SelfReferral { user: UserId },

    #[error("user {user} has already been referred")]
    AlreadyReferred { user: UserId },

    #[error("payout {payout} is not in a state that allows this operation (status: {status})")]
    InvalidPayoutState { payout: PayoutId, status: String },

    #[error("{field} is invalid: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("promo config field {field} rejected: {reason}")]
    InvalidConfig { field: String, reason: String },

    #[error("caller does not have permission to perform this action")]
    Forbidden,

    #[error("storage contention exceeded the retry budget")]
    StorageContention,

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl CoreError {
    /// The stable small-int code serialized in [`ErrorResponse::code`].
    fn code(&self) -> u16 {
        match self {
            CoreError::UserNotFound { .. } => 1,
            CoreError::OrderNotFound { .. } => 2,
            CoreError::OrderAlreadyDelivered { .. } => 15,
            CoreError::PayoutNotFound { .. } => 3,
            CoreError::InsufficientFunds { .. } => 4,
            CoreError::RiderPaymentBlocked { .. } => 5,
            CoreError::RiderDeactivated { .. } => 6,
            CoreError::UnknownReferralCode { .. } => 7,
            CoreError::SelfReferral { .. } => 8,
            CoreError::AlreadyReferred { .. } => 9,
            CoreError::InvalidPayoutState { .. } => 10,
            CoreError::InvalidInput { .. } => 11,
            CoreError::Forbidden => 12,
            CoreError::StorageContention => 13,
            CoreError::Internal(_) => 14,
            CoreError::InvalidConfig { .. } => 16,
        }
    }

    /// Variant-specific structured context for the wire response's `data`
    /// field, so API consumers don't have to regex the message string.
    fn data(&self) -> serde_json::Value {
        match self {
            CoreError::UserNotFound { user } => json!({ "user": user }),
            CoreError::OrderNotFound { order } => json!({ "order": order }),
            CoreError::OrderAlreadyDelivered { order } => json!({ "order": order }),
            CoreError::PayoutNotFound { payout } => json!({ "payout": payout }),
            CoreError::InsufficientFunds {
                user,
                balance,
                requested,
            } => json!({
                "user": user,
                "balance": balance.as_decimal(),
                "requested": requested.as_decimal(),
            }),
            CoreError::RiderPaymentBlocked { rider, reason } => {
                json!({ "rider": rider, "reason": reason })
            }
            CoreError::RiderDeactivated { rider, reason } => {
                json!({ "rider": rider, "reason": reason })
            }
            CoreError::UnknownReferralCode { code } => json!({ "code": code }),
            CoreError::SelfReferral { user } => json!({ "user": user }),
            CoreError::AlreadyReferred { user } => json!({ "user": user }),
            CoreError::InvalidPayoutState { payout, status } => {
                json!({ "payout": payout, "status": status })
            }
            CoreError::InvalidInput { field, reason } => {
                json!({ "field": field, "reason": reason })
            }
            CoreError::InvalidConfig { field, reason } => {
                json!({ "field": field, "reason": reason })
            }
            CoreError::Forbidden
            | CoreError::StorageContention
            | CoreError::Internal(_) => serde_json::Value::Null,
        }
    }
}

impl ToHttpStatus for CoreError {
    fn to_http_status(&self) -> StatusCode {
        match self {
            CoreError::UserNotFound { .. }
            | CoreError::OrderNotFound { .. }
            | CoreError::PayoutNotFound { .. } => StatusCode::NOT_FOUND,

            CoreError::OrderAlreadyDelivered { .. }
            | CoreError::InsufficientFunds { .. }
            | CoreError::RiderPaymentBlocked { .. }
            | CoreError::RiderDeactivated { .. }
            | CoreError::SelfReferral { .. }
            | CoreError::AlreadyReferred { .. }
            | CoreError::InvalidPayoutState { .. }
            | CoreError::InvalidInput { .. }
            | CoreError::InvalidConfig { .. }
            | CoreError::UnknownReferralCode { .. } => StatusCode::UNPROCESSABLE_ENTITY,

            CoreError::Forbidden => StatusCode::FORBIDDEN,

            CoreError::StorageContention => StatusCode::SERVICE_UNAVAILABLE,

            CoreError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<&CoreError> for ErrorResponse {
    fn from(err: &CoreError) -> Self {
        ErrorResponse {
            code: err.code(),
            msg: err.to_string(),
            data: err.data(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let err = CoreError::OrderNotFound {
            order: "abc".parse().unwrap(),
        };
        assert_eq!(err.to_http_status(), StatusCode::NOT_FOUND);
    }
}
