use std::sync::Arc;

use axum::extract::{Path, State};
use common::ids::{OrderId, UserId};
use common::rng::SysRng;
use common::time::UtcMillis;
use earnings_core::error::CoreError;
use earnings_core::event_bus::DomainEvent;
use earnings_core::models::OrderStatus;
use earnings_core::{commission, enforcement, gold_status, payout, referral, streak};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::extract::LxJson;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct DeliverRequest {
    pub rider_id: UserId,
}

#[derive(Serialize)]
pub struct DeliverResponse {
    pub gross_amount: common::money::Money,
    pub commission_amount: common::money::Money,
    pub rider_net_amount: common::money::Money,
}

/// Marks an order delivered and runs the full downstream pipeline: the
/// commission split, the referral/gold-status promo engines, and the
/// weekly payout aggregator (§4.3-§4.7, §4.4, §4.6). Ordered so every
/// wallet credit is recorded before the payout document is updated,
/// matching the order the teacher's payment pipeline commits side effects
/// in. The streak engine advances on acceptance, not here (§4.5) -- see
/// `accept`.
pub async fn deliver(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<OrderId>,
    LxJson(body): LxJson<DeliverRequest>,
) -> Result<LxJson<DeliverResponse>, ApiError> {
    enforcement::assert_not_blocked(&state.store, &body.rider_id).await?;

    let mut rng = SysRng::new();
    let now = UtcMillis::now();

    let financial = commission::deliver_and_split(
        &state.store,
        &state.promo_config,
        &state.settings,
        &order_id,
        &body.rider_id,
        now,
    )
    .await?;

    let order = state.store.get_order(&order_id).await?;

    // §4.4 step 3: every trip-taking participant who might be sitting on an
    // unpaid referral gets processed, not just the delivering rider.
    referral::record_trip_and_maybe_reward(
        &state.store,
        &mut rng,
        &state.bus,
        &state.promo_config,
        &order.customer_id,
        now,
    )
    .await?;
    if order.customer_id != body.rider_id {
        referral::record_trip_and_maybe_reward(
            &state.store,
            &mut rng,
            &state.bus,
            &state.promo_config,
            &body.rider_id,
            now,
        )
        .await?;
    }

    gold_status::record_delivery_and_maybe_unlock(
        &state.store,
        &state.bus,
        &state.promo_config,
        &state.settings,
        &body.rider_id,
        order.service_type,
        now,
    )
    .await?;

    payout::upsert_for_delivery(
        &state.store,
        &mut rng,
        &state.settings,
        &body.rider_id,
        order_id.clone(),
        order.service_type,
        &financial,
        now,
    )
    .await?;

    state
        .bus
        .publish(DomainEvent::OrderDelivered {
            order: order_id,
            rider: body.rider_id,
            gross: financial.gross_amount,
            commission: financial.commission_amount,
            rider_net: financial.rider_net_amount,
            at: now,
        })
        .await;

    Ok(LxJson(DeliverResponse {
        gross_amount: financial.gross_amount,
        commission_amount: financial.commission_amount,
        rider_net_amount: financial.rider_net_amount,
    }))
}

#[derive(Deserialize)]
pub struct AcceptRequest {
    pub rider_id: UserId,
}

/// Assigns `order_id` to `rider_id` and advances their streak (§4.5). The
/// out-of-scope dispatch system decides *which* rider gets offered an
/// order; this is the seam it calls once that rider has accepted.
pub async fn accept(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<OrderId>,
    LxJson(body): LxJson<AcceptRequest>,
) -> Result<(), ApiError> {
    enforcement::assert_not_blocked(&state.store, &body.rider_id).await?;
    let now = UtcMillis::now();

    state
        .store
        .transact_order(&order_id, {
            let rider_id = body.rider_id.clone();
            move |order| {
                if order.status != OrderStatus::Pending {
                    return Err(CoreError::InvalidInput {
                        field: "status".to_string(),
                        reason: format!("order is {:?}, not pending", order.status),
                    });
                }
                order.status = OrderStatus::Assigned;
                order.rider_id = Some(rider_id);
                Ok(())
            }
        })
        .await?;

    let mut rng = SysRng::new();
    streak::record_acceptance_and_maybe_bonus(
        &state.store,
        &mut rng,
        &state.bus,
        &state.promo_config,
        &body.rider_id,
        order_id,
        now,
    )
    .await?;
    Ok(())
}

/// Declines or cancels an accepted order before delivery, breaking the
/// assigned rider's streak without paying a bonus (§4.5). A no-op on the
/// streak if the order was never assigned to anyone.
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<OrderId>,
) -> Result<(), ApiError> {
    let rider_id = state
        .store
        .transact_order(&order_id, |order| {
            if matches!(order.status, OrderStatus::Delivered | OrderStatus::Cancelled) {
                return Err(CoreError::InvalidInput {
                    field: "status".to_string(),
                    reason: format!("order is {:?}, cannot be cancelled", order.status),
                });
            }
            order.status = OrderStatus::Cancelled;
            Ok(order.rider_id.clone())
        })
        .await?;

    if let Some(rider_id) = rider_id {
        streak::reset_streak(&state.store, &rider_id).await?;
    }
    Ok(())
}
