//! The commission splitter (§4.3): on delivery, splits an order's gross
//! amount into the platform's commission and the rider's net share and
//! freezes both onto the order. The rider has already collected the gross
//! amount from the customer outside this system (cash, or their own
//! Paystack terminal); the wallet is never auto-credited here; see §4.2 and
//! the glossary entry for "payout."

use common::ids::{OrderId, UserId};
use common::time::UtcMillis;

use crate::error::CoreError;
use crate::gold_status;
use crate::models::{Financial, OrderStatus};
use crate::promo_config::PromoConfigStore;
use crate::settings::Settings;
use crate::store::Store;

/// Marks `order` delivered and computes its commission split using the
/// rider's effective commission rate (gold-status discount included,
/// §4.6). Returns the frozen [`Financial`] split.
pub async fn deliver_and_split(
    store: &impl Store,
    promo_config: &PromoConfigStore,
    settings: &Settings,
    order_id: &OrderId,
    rider_id: &UserId,
    now: UtcMillis,
) -> Result<Financial, CoreError> {
    let rider = store.get_user(rider_id).await?;
    let pct = gold_status::effective_commission_pct(&rider, promo_config, settings, now);

    let financial = store
        .transact_order(order_id, move |order| {
            if order.status == OrderStatus::Delivered {
                return Err(CoreError::OrderAlreadyDelivered {
                    order: order.id.clone(),
                });
            }
            let gross = order.price;
            let commission = gross
                .checked_mul_percent(pct)
                .ok_or_else(|| CoreError::InvalidInput {
                    field: "price".to_string(),
                    reason: "commission computation overflowed".to_string(),
                })?;
            let rider_net =
                gross.checked_sub(commission).ok_or_else(|| CoreError::InvalidInput {
                    field: "price".to_string(),
                    reason: "commission exceeded gross amount".to_string(),
                })?;
            let financial = Financial {
                gross_amount: gross,
                commission_rate_pct: pct,
                commission_amount: commission,
                rider_net_amount: rider_net,
            };
            order.status = OrderStatus::Delivered;
            order.delivered_at = Some(now);
            order.rider_id = Some(rider_id.clone());
            order.financial = Some(financial.clone());
            Ok(financial)
        })
        .await?;

    Ok(financial)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mem_store::MemStore;
    use crate::models::{Order, Role, ServiceType, User};
    use common::rng::SysRng;

    #[tokio::test]
    async fn split_adds_to_gross_and_credits_net() {
        let store = MemStore::new();
        let promo_config = PromoConfigStore::default();
        let settings = Settings::default();
        let mut rng = SysRng::new();

        let rider_id = UserId::generate(&mut rng);
        store
            .insert_user(User::new(rider_id.clone(), Role::Rider, "C1".into()))
            .await
            .unwrap();
        let customer_id = UserId::generate(&mut rng);
        let order_id = OrderId::generate(&mut rng);
        store
            .insert_order(Order::new(
                order_id.clone(),
                customer_id,
                ServiceType::Courier,
                Money::from_minor_units(1_000_000),
            ))
            .await
            .unwrap();

        let financial = deliver_and_split(
            &store,
            &promo_config,
            &settings,
            &order_id,
            &rider_id,
            UtcMillis::from_millis(0),
        )
        .await
        .unwrap();

        assert_eq!(
            financial.commission_amount.checked_add(financial.rider_net_amount),
            Some(financial.gross_amount)
        );
        // The rider collects gross outside this system; delivery alone must
        // never auto-credit the wallet.
        let wallet = store.get_wallet(&rider_id).await.unwrap();
        assert!(wallet.balance.is_zero());
    }

    #[tokio::test]
    async fn redelivering_the_same_order_is_rejected() {
        let store = MemStore::new();
        let promo_config = PromoConfigStore::default();
        let settings = Settings::default();
        let mut rng = SysRng::new();

        let rider_id = UserId::generate(&mut rng);
        store
            .insert_user(User::new(rider_id.clone(), Role::Rider, "C2".into()))
            .await
            .unwrap();
        let customer_id = UserId::generate(&mut rng);
        let order_id = OrderId::generate(&mut rng);
        store
            .insert_order(Order::new(
                order_id.clone(),
                customer_id,
                ServiceType::Courier,
                Money::from_minor_units(10_000),
            ))
            .await
            .unwrap();

        deliver_and_split(
            &store,
            &promo_config,
            &settings,
            &order_id,
            &rider_id,
            UtcMillis::from_millis(0),
        )
        .await
        .unwrap();

        let err = deliver_and_split(
            &store,
            &promo_config,
            &settings,
            &order_id,
            &rider_id,
            UtcMillis::from_millis(1),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CoreError::OrderAlreadyDelivered { .. }));
    }
}
