//! The streak engine (§4.5): consecutive accepted orders build a streak:
//! once a rider hits the configured streak length they're paid a bonus and
//! the streak resets. Declining or cancelling an order breaks the streak
//! without paying anything.

use common::ids::{OrderId, UserId};
use common::rng::Crng;
use common::time::UtcMillis;
use serde_json::json;

use crate::error::CoreError;
use crate::event_bus::{DomainEvent, EventBus};
use crate::models::TransactionType;
use crate::promo_config::PromoConfigStore;
use crate::store::Store;
use crate::wallet;

/// Advances `rider_id`'s streak for a just-accepted order and pays the
/// streak bonus if the threshold is reached. Idempotent per `order_id`: a
/// replayed acceptance event for an order already recorded is a no-op, so a
/// retried request can never double-advance (or double-reset) the streak.
pub async fn record_acceptance_and_maybe_bonus(
    store: &impl Store,
    rng: &mut impl Crng,
    bus: &EventBus,
    promo_config: &PromoConfigStore,
    rider_id: &UserId,
    order_id: OrderId,
    now: UtcMillis,
) -> Result<(), CoreError> {
    let config = promo_config.get().streak;
    if !config.enabled {
        return Ok(());
    }

    let bonus = store
        .transact_user(rider_id, move |user| {
            if user.streak_bonus_order_ids.contains(&order_id) {
                return Ok(None);
            }
            user.streak_bonus_order_ids.insert(order_id);
            user.current_streak += 1;
            if user.current_streak >= config.required_streak {
                user.current_streak = 0;
                user.last_streak_bonus_at = Some(now);
                user.total_streak_bonuses += 1;
                Ok(Some(config.bonus_amount))
            } else {
                Ok(None)
            }
        })
        .await?;

    let Some(amount) = bonus else {
        return Ok(());
    };

    wallet::credit(
        store,
        rng,
        rider_id,
        TransactionType::StreakBonus,
        amount,
        None,
        None,
        json!({ "streak_length": config.required_streak }),
        now,
    )
    .await?;

    bus.publish(DomainEvent::StreakBonusAwarded {
        rider: rider_id.clone(),
        streak: config.required_streak,
        amount,
    })
    .await;

    Ok(())
}

/// Breaks `rider_id`'s streak without paying a bonus. Called when an
/// accepted order is later declined or cancelled before delivery (§4.5).
pub async fn reset_streak(store: &impl Store, rider_id: &UserId) -> Result<(), CoreError> {
    store
        .transact_user(rider_id, |user| {
            user.current_streak = 0;
            Ok(())
        })
        .await
}
