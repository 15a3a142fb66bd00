//! The Gold Status engine (§4.6): riders who complete enough deliveries
//! within a rolling window earn a temporary commission discount.

use std::time::Duration;

use rust_decimal::Decimal;

use common::ids::UserId;
use common::time::UtcMillis;

use crate::error::CoreError;
use crate::event_bus::{DomainEvent, EventBus};
use crate::models::{ServiceType, User};
use crate::promo_config::PromoConfigStore;
use crate::settings::Settings;
use crate::store::Store;

/// The commission rate that should actually be applied to a rider's next
/// split, right now: the base rate, discounted if Gold Status is currently
/// active. Computed fresh at split time and never persisted back onto the
/// rider or the promo config, so a discount only ever affects commissions
/// charged while it's active (§4.6 resolves the "past orders" ambiguity
/// this way).
pub fn effective_commission_pct(
    rider: &User,
    promo_config: &PromoConfigStore,
    settings: &Settings,
    now: UtcMillis,
) -> Decimal {
    let base = settings.commission_rate_percent;
    if !promo_config.get().gold_status.enabled {
        return base;
    }
    if !rider.gold_status.is_active(now) {
        return base;
    }
    let factor = (Decimal::ONE - rider.gold_status.discount_percent / Decimal::from(100))
        .max(Decimal::ZERO);
    (base * factor).max(Decimal::ZERO)
}

/// Records a completed delivery against the rider's rolling window and
/// unlocks (or extends) Gold Status if the threshold is now met. Called
/// once per delivered order, after the commission split. Only `Ride` orders
/// count toward Gold Status (§4.6); a `Courier` delivery is a no-op.
pub async fn record_delivery_and_maybe_unlock(
    store: &impl Store,
    bus: &EventBus,
    promo_config: &PromoConfigStore,
    settings: &Settings,
    rider_id: &UserId,
    service_type: ServiceType,
    now: UtcMillis,
) -> Result<(), CoreError> {
    if service_type != ServiceType::Ride {
        return Ok(());
    }
    let config = promo_config.get().gold_status;
    if !config.enabled {
        return Ok(());
    }
    let window = Duration::from_secs(u64::from(config.window_days) * 86_400);
    let duration = Duration::from_secs(u64::from(config.duration_days) * 86_400);

    let unlocked = store
        .transact_user(rider_id, move |user| {
            user.recent_deliveries.push(now);
            let cutoff = now.saturating_sub(window);
            user.recent_deliveries
                .retain(|ts| ts.as_i64() >= cutoff.as_i64());

            if user.recent_deliveries.len() < config.required_rides as usize {
                return Ok(None);
            }
            let expires_at = now.saturating_add(duration);
            user.gold_status.unlocked_at = Some(now);
            user.gold_status.expires_at = Some(expires_at);
            user.gold_status.discount_percent = config.discount_percent;
            user.gold_status.total_unlocks += 1;
            user.gold_status.expiry_notified = false;
            Ok(Some(expires_at))
        })
        .await?;

    if let Some(expires_at) = unlocked {
        bus.publish(DomainEvent::GoldStatusUnlocked {
            rider: rider_id.clone(),
            expires_at,
        })
        .await;
    }
    Ok(())
}

/// Scans for riders whose Gold Status has lapsed since it was last checked
/// and emits a one-shot expiry event for each. Intended to be driven by the
/// same periodic sweep that drives the payment-window controller (§4.8).
pub async fn notify_expired(
    store: &impl Store,
    bus: &EventBus,
    rider_id: &UserId,
    now: UtcMillis,
) -> Result<(), CoreError> {
    let should_notify = store
        .transact_user(rider_id, move |user| {
            let lapsed = match user.gold_status.expires_at {
                Some(expires_at) => expires_at.as_i64() <= now.as_i64(),
                None => false,
            };
            if lapsed && !user.gold_status.expiry_notified {
                user.gold_status.expiry_notified = true;
                Ok(true)
            } else {
                Ok(false)
            }
        })
        .await?;

    if should_notify {
        bus.publish(DomainEvent::GoldStatusExpired {
            rider: rider_id.clone(),
        })
        .await;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mem_store::MemStore;
    use crate::models::Role;
    use common::rng::SysRng;

    async fn rider(store: &MemStore) -> UserId {
        let mut rng = SysRng::new();
        let id = UserId::generate(&mut rng);
        store
            .insert_user(User::new(id.clone(), Role::Rider, "G1".into()))
            .await
            .unwrap();
        id
    }

    #[tokio::test]
    async fn unlocks_after_required_rides_in_window() {
        let store = MemStore::new();
        let bus = EventBus::new();
        let promo_config = PromoConfigStore::default();
        let settings = Settings::default();
        let rider_id = rider(&store).await;

        let required = promo_config.get().gold_status.required_rides;
        for i in 0..required {
            record_delivery_and_maybe_unlock(
                &store,
                &bus,
                &promo_config,
                &settings,
                &rider_id,
                ServiceType::Ride,
                UtcMillis::from_millis(1_000 * i as i64),
            )
            .await
            .unwrap();
        }

        let user = store.get_user(&rider_id).await.unwrap();
        assert!(user
            .gold_status
            .is_active(UtcMillis::from_millis(1_000 * required as i64)));
    }

    #[tokio::test]
    async fn courier_deliveries_never_count_toward_gold_status() {
        let store = MemStore::new();
        let bus = EventBus::new();
        let promo_config = PromoConfigStore::default();
        let settings = Settings::default();
        let rider_id = rider(&store).await;

        let required = promo_config.get().gold_status.required_rides;
        for i in 0..(required * 2) {
            record_delivery_and_maybe_unlock(
                &store,
                &bus,
                &promo_config,
                &settings,
                &rider_id,
                ServiceType::Courier,
                UtcMillis::from_millis(1_000 * i as i64),
            )
            .await
            .unwrap();
        }

        let user = store.get_user(&rider_id).await.unwrap();
        assert!(user.recent_deliveries.is_empty());
        assert!(!user.gold_status.is_active(UtcMillis::from_millis(1_000 * required as i64)));
    }

    #[tokio::test]
    async fn discount_applies_only_while_active() {
        let store = MemStore::new();
        let promo_config = PromoConfigStore::default();
        let settings = Settings::default();
        let mut user = User::new(
            UserId::generate(&mut SysRng::new()),
            Role::Rider,
            "G2".into(),
        );
        let base = settings.commission_rate_percent;
        assert_eq!(
            effective_commission_pct(&user, &promo_config, &settings, UtcMillis::from_millis(0)),
            base
        );

        user.gold_status.unlocked_at = Some(UtcMillis::from_millis(0));
        user.gold_status.expires_at = Some(UtcMillis::from_millis(1_000));
        user.gold_status.discount_percent = rust_decimal::Decimal::from(5);
        let discounted =
            effective_commission_pct(&user, &promo_config, &settings, UtcMillis::from_millis(500));
        assert_eq!(
            discounted,
            base * (rust_decimal::Decimal::from(95) / rust_decimal::Decimal::from(100))
        );

        let expired =
            effective_commission_pct(&user, &promo_config, &settings, UtcMillis::from_millis(1_500));
        assert_eq!(expired, base);
        let _ = store; // keep store alive for symmetry with other tests
    }
}
