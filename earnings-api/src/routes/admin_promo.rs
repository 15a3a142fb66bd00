use std::sync::Arc;

use axum::extract::State;
use common::time::UtcMillis;
use earnings_core::models::{GoldStatusConfig, PromoConfig, ReferralConfig, StreakConfig};
use serde::Deserialize;

use crate::auth::CallerIdentity;
use crate::error::ApiError;
use crate::extract::LxJson;
use crate::state::AppState;

/// The whole promo config singleton, for admin inspection (§4.1).
pub async fn get_config(State(state): State<Arc<AppState>>) -> LxJson<PromoConfig> {
    LxJson((*state.promo_config.get()).clone())
}

pub async fn put_referral(
    State(state): State<Arc<AppState>>,
    caller: CallerIdentity,
    LxJson(body): LxJson<ReferralConfig>,
) -> Result<LxJson<PromoConfig>, ApiError> {
    body.validate()?;
    state
        .promo_config
        .update_referral(body, UtcMillis::now(), caller.user_id);
    Ok(LxJson((*state.promo_config.get()).clone()))
}

pub async fn put_streak(
    State(state): State<Arc<AppState>>,
    caller: CallerIdentity,
    LxJson(body): LxJson<StreakConfig>,
) -> Result<LxJson<PromoConfig>, ApiError> {
    body.validate()?;
    state
        .promo_config
        .update_streak(body, UtcMillis::now(), caller.user_id);
    Ok(LxJson((*state.promo_config.get()).clone()))
}

pub async fn put_gold_status(
    State(state): State<Arc<AppState>>,
    caller: CallerIdentity,
    LxJson(body): LxJson<GoldStatusConfig>,
) -> Result<LxJson<PromoConfig>, ApiError> {
    body.validate()?;
    state
        .promo_config
        .update_gold_status(body, UtcMillis::now(), caller.user_id);
    Ok(LxJson((*state.promo_config.get()).clone()))
}

#[derive(Deserialize)]
pub struct ToggleAllRequest {
    pub enabled: bool,
}

/// Flips every promo engine's `enabled` flag at once (§4.1 `toggleAll`).
pub async fn toggle_all(
    State(state): State<Arc<AppState>>,
    caller: CallerIdentity,
    LxJson(body): LxJson<ToggleAllRequest>,
) -> Result<LxJson<PromoConfig>, ApiError> {
    state
        .promo_config
        .toggle_all(body.enabled, UtcMillis::now(), caller.user_id);
    Ok(LxJson((*state.promo_config.get()).clone()))
}
