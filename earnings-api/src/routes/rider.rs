use std::sync::Arc;

use axum::extract::State;
use common::money::Money;
use common::time::UtcMillis;
use serde::Serialize;

use crate::auth::CallerIdentity;
use crate::error::ApiError;
use crate::extract::LxJson;
use crate::state::AppState;

#[derive(Serialize)]
pub struct EarningsResponse {
    pub balance: Money,
    pub current_streak: u32,
    pub total_streak_bonuses: u32,
    pub completed_trips: u64,
    pub gold_status_active: bool,
    pub gold_status_expires_at: Option<UtcMillis>,
}

/// The calling rider's own wallet balance and promo standing (§6a).
pub async fn earnings(
    State(state): State<Arc<AppState>>,
    caller: CallerIdentity,
) -> Result<LxJson<EarningsResponse>, ApiError> {
    let user = state.store.get_user(&caller.user_id).await?;
    let wallet = state.store.get_wallet(&caller.user_id).await?;
    let now = UtcMillis::now();

    Ok(LxJson(EarningsResponse {
        balance: wallet.balance,
        current_streak: user.current_streak,
        total_streak_bonuses: user.total_streak_bonuses,
        completed_trips: user.completed_trips,
        gold_status_active: user.gold_status.is_active(now),
        gold_status_expires_at: user.gold_status.expires_at,
    }))
}
