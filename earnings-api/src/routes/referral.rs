use std::sync::Arc;

use axum::extract::State;
use common::money::Money;
use common::rng::SysRng;
use common::time::UtcMillis;
use earnings_core::referral;
use serde::{Deserialize, Serialize};

use crate::auth::CallerIdentity;
use crate::error::ApiError;
use crate::extract::LxJson;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ClaimRequest {
    pub code: String,
}

#[derive(Serialize)]
pub struct ClaimResponse {
    pub referrer_code: String,
}

/// Claims a referrer's code on behalf of the calling rider (§4.4).
pub async fn claim(
    State(state): State<Arc<AppState>>,
    caller: CallerIdentity,
    LxJson(body): LxJson<ClaimRequest>,
) -> Result<LxJson<ClaimResponse>, ApiError> {
    let mut rng = SysRng::new();
    let referral = referral::claim(
        &state.store,
        &mut rng,
        &caller.user_id,
        &body.code,
        UtcMillis::now(),
    )
    .await?;

    Ok(LxJson(ClaimResponse {
        referrer_code: referral.referral_code,
    }))
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub completed_trips: u64,
    pub reward_amount: Money,
    pub reward_paid: bool,
}

/// The calling rider's own referral progress, if they were referred by
/// someone (§4.4).
pub async fn stats(
    State(state): State<Arc<AppState>>,
    caller: CallerIdentity,
) -> Result<LxJson<StatsResponse>, ApiError> {
    let referral = state
        .store
        .find_referral_by_referred(&caller.user_id)
        .await?
        .ok_or_else(|| earnings_core::error::CoreError::InvalidInput {
            field: "referral".to_string(),
            reason: "caller has not claimed a referral code".to_string(),
        })?;

    Ok(LxJson(StatsResponse {
        completed_trips: referral.completed_trips,
        reward_amount: referral.reward_amount,
        reward_paid: referral.reward_paid,
    }))
}
