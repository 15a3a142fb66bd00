use std::sync::Arc;

use axum::extract::{Path, State};
use common::ids::{PayoutId, UserId};
use common::time::UtcMillis;
use earnings_core::enforcement;
use serde::Deserialize;

use crate::error::ApiError;
use crate::extract::LxJson;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ReasonRequest {
    pub reason: String,
}

/// Blocks a rider from receiving further payouts (§4.9). Normally driven by
/// the payment-window sweep; exposed here for manual admin intervention.
pub async fn block(
    State(state): State<Arc<AppState>>,
    Path(rider_id): Path<UserId>,
    LxJson(body): LxJson<ReasonRequest>,
) -> Result<(), ApiError> {
    enforcement::block_for_nonpayment(
        &state.store,
        &state.bus,
        &rider_id,
        body.reason,
        UtcMillis::now(),
    )
    .await?;
    Ok(())
}

pub async fn unblock(
    State(state): State<Arc<AppState>>,
    Path(rider_id): Path<UserId>,
) -> Result<(), ApiError> {
    enforcement::unblock(&state.store, &rider_id).await?;
    Ok(())
}

#[derive(Deserialize)]
pub struct StrikeRequest {
    pub reason: String,
    pub payout_id: PayoutId,
}

pub async fn strike(
    State(state): State<Arc<AppState>>,
    Path(rider_id): Path<UserId>,
    LxJson(body): LxJson<StrikeRequest>,
) -> Result<(), ApiError> {
    enforcement::add_strike(
        &state.store,
        &state.bus,
        &state.settings,
        &rider_id,
        body.reason,
        body.payout_id,
        UtcMillis::now(),
    )
    .await?;
    Ok(())
}

pub async fn deactivate(
    State(state): State<Arc<AppState>>,
    Path(rider_id): Path<UserId>,
    LxJson(body): LxJson<ReasonRequest>,
) -> Result<(), ApiError> {
    enforcement::deactivate(
        &state.store,
        &state.bus,
        &rider_id,
        body.reason,
        UtcMillis::now(),
    )
    .await?;
    Ok(())
}

#[derive(Deserialize, Default)]
pub struct ReactivateRequest {
    #[serde(default)]
    pub unblock_payment: bool,
}

pub async fn reactivate(
    State(state): State<Arc<AppState>>,
    Path(rider_id): Path<UserId>,
    LxJson(body): LxJson<ReactivateRequest>,
) -> Result<(), ApiError> {
    enforcement::reactivate(&state.store, &rider_id, body.unblock_payment).await?;
    Ok(())
}
