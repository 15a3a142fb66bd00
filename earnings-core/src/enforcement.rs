//! Enforcement actions (§4.9): blocking/unblocking payment, accumulating
//! strikes, and deactivating/reactivating a rider's account. Driven either
//! by an admin action or by the payment-window controller's sweep (§4.8).

use common::ids::UserId;
use common::time::UtcMillis;

use crate::error::CoreError;
use crate::event_bus::{DomainEvent, EventBus};
use crate::models::{BlockedCredentials, StrikeEvent, User};
use crate::settings::Settings;
use crate::store::Store;

/// Blocks `rider_id` from receiving further payouts. A no-op (no event) if
/// already blocked, so the sweep can call this every tick without spamming
/// the event bus.
pub async fn block_for_nonpayment(
    store: &impl Store,
    bus: &EventBus,
    rider_id: &UserId,
    reason: String,
    now: UtcMillis,
) -> Result<(), CoreError> {
    let newly_blocked = store
        .transact_user(rider_id, {
            let reason = reason.clone();
            move |user| {
                if user.payment_blocked {
                    return Ok(false);
                }
                user.payment_blocked = true;
                user.payment_blocked_at = Some(now);
                user.payment_blocked_reason = Some(reason);
                Ok(true)
            }
        })
        .await?;

    if newly_blocked {
        bus.publish(DomainEvent::RiderPaymentBlocked {
            rider: rider_id.clone(),
            reason,
        })
        .await;
    }
    Ok(())
}

pub async fn unblock(store: &impl Store, rider_id: &UserId) -> Result<(), CoreError> {
    store
        .transact_user(rider_id, |user| {
            user.payment_blocked = false;
            user.payment_blocked_at = None;
            user.payment_blocked_reason = None;
            Ok(())
        })
        .await
}

/// Records a strike against `rider_id` and deactivates the account once
/// `strikes_before_deactivation` is reached.
pub async fn add_strike(
    store: &impl Store,
    bus: &EventBus,
    settings: &Settings,
    rider_id: &UserId,
    reason: String,
    payout: common::ids::PayoutId,
    now: UtcMillis,
) -> Result<(), CoreError> {
    let strike_count = store
        .transact_user(rider_id, move |user| {
            user.strikes.push(StrikeEvent {
                at: now,
                reason,
                payout_id: payout,
            });
            Ok(user.strikes.len())
        })
        .await?;

    bus.publish(DomainEvent::RiderStruck {
        rider: rider_id.clone(),
        strike_count,
    })
    .await;

    if strike_count >= settings.strikes_before_deactivation as usize {
        deactivate(
            store,
            bus,
            rider_id,
            "automatic: strike threshold reached".to_string(),
            now,
        )
        .await?;
    }
    Ok(())
}

/// Deactivates `rider_id`'s account and blocks their identifying
/// credentials from future registration (§4.9 edge case).
pub async fn deactivate(
    store: &impl Store,
    bus: &EventBus,
    rider_id: &UserId,
    reason: String,
    now: UtcMillis,
) -> Result<(), CoreError> {
    let user: User = store
        .transact_user(rider_id, {
            let reason = reason.clone();
            move |user| {
                user.account_deactivated = true;
                user.account_deactivated_at = Some(now);
                user.account_deactivated_reason = Some(reason);
                Ok(user.clone())
            }
        })
        .await?;

    store
        .insert_blocked_credentials(BlockedCredentials {
            rider_id: rider_id.clone(),
            nin: non_empty(user.nin),
            email: non_empty(user.email),
            phone_number: non_empty(user.phone_number),
            created_at: now,
        })
        .await?;

    bus.publish(DomainEvent::RiderDeactivated {
        rider: rider_id.clone(),
        reason,
    })
    .await;
    Ok(())
}

/// Reactivates `rider_id`'s account. `unblock_payment` additionally clears
/// any outstanding payment block (§4.9) -- left `false` by default since
/// reactivation and payment-unblocking are logically separate admin
/// decisions that don't always coincide (a reactivated rider may still owe
/// an overdue payout).
pub async fn reactivate(
    store: &impl Store,
    rider_id: &UserId,
    unblock_payment: bool,
) -> Result<(), CoreError> {
    store
        .transact_user(rider_id, move |user| {
            user.account_deactivated = false;
            user.account_deactivated_at = None;
            user.account_deactivated_reason = None;
            user.strikes.clear();
            if unblock_payment {
                user.payment_blocked = false;
                user.payment_blocked_at = None;
                user.payment_blocked_reason = None;
            }
            Ok(())
        })
        .await
}

/// The seam the out-of-scope order-dispatch/presence collaborator calls
/// before handing a rider a new order (§4.9).
pub async fn assert_not_blocked(store: &impl Store, rider_id: &UserId) -> Result<(), CoreError> {
    let user = store.get_user(rider_id).await?;
    if user.account_deactivated {
        return Err(CoreError::RiderDeactivated {
            rider: rider_id.clone(),
            reason: user.account_deactivated_reason.unwrap_or_default(),
        });
    }
    if user.payment_blocked {
        return Err(CoreError::RiderPaymentBlocked {
            rider: rider_id.clone(),
            reason: user.payment_blocked_reason.unwrap_or_default(),
        });
    }
    Ok(())
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}
