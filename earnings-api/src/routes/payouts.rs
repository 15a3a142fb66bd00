use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use common::ids::PayoutId;
use common::money::Money;
use common::rng::SysRng;
use common::time::UtcMillis;
use earnings_core::error::CoreError;
use earnings_core::models::{MarkedPaidBy, RiderPayout};
use earnings_core::payout;
use serde::{Deserialize, Serialize};

use crate::auth::CallerIdentity;
use crate::error::ApiError;
use crate::extract::LxJson;
use crate::state::AppState;

const MAX_PROOF_BYTES: usize = 5 * 1024 * 1024;

#[derive(Serialize)]
pub struct PayoutView {
    pub id: PayoutId,
    pub week_start: UtcMillis,
    pub week_end: UtcMillis,
    pub totals: earnings_core::models::PayoutTotals,
    pub status: earnings_core::models::PayoutStatus,
    pub payment_reference_code: String,
}

impl From<RiderPayout> for PayoutView {
    fn from(p: RiderPayout) -> Self {
        Self {
            id: p.id,
            week_start: p.week_start,
            week_end: p.week_end,
            totals: p.totals,
            status: p.status,
            payment_reference_code: p.payment_reference_code,
        }
    }
}

/// Lists every payout document ever generated for the calling rider (§4.7).
pub async fn list_mine(
    State(state): State<Arc<AppState>>,
    caller: CallerIdentity,
) -> Result<LxJson<Vec<PayoutView>>, ApiError> {
    let payouts = state.store.list_payouts_for_rider(&caller.user_id).await?;
    Ok(LxJson(payouts.into_iter().map(PayoutView::from).collect()))
}

/// Marks a payout paid, accepting an optional payment-proof image upload
/// (§6a: `image/*`, at most 5 MiB). The rider marking their own payout paid
/// and an admin marking any rider's payout paid both land here; the caller's
/// role only changes `MarkedPaidBy`, not the validation.
pub async fn mark_paid(
    State(state): State<Arc<AppState>>,
    caller: CallerIdentity,
    Path(payout_id): Path<PayoutId>,
    mut multipart: Multipart,
) -> Result<LxJson<PayoutView>, ApiError> {
    let mut proof_url = None;
    let mut rewards_used = Money::ZERO;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| CoreError::InvalidInput {
            field: "proof".to_string(),
            reason: e.to_string(),
        })?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if name == "rewards_used" {
            let text = field.text().await.map_err(|e| CoreError::InvalidInput {
                field: "rewards_used".to_string(),
                reason: e.to_string(),
            })?;
            let decimal: rust_decimal::Decimal =
                text.parse().map_err(|_| CoreError::InvalidInput {
                    field: "rewards_used".to_string(),
                    reason: format!("{text:?} is not a valid amount"),
                })?;
            rewards_used = Money::try_from_decimal(decimal).map_err(|_| CoreError::InvalidInput {
                field: "rewards_used".to_string(),
                reason: format!("{text:?} is not a valid amount"),
            })?;
            continue;
        }
        if name != "proof" {
            continue;
        }
        let content_type = field
            .content_type()
            .unwrap_or_default()
            .to_string();
        if !content_type.starts_with("image/") {
            return Err(CoreError::InvalidInput {
                field: "proof".to_string(),
                reason: format!("expected an image/* upload, got {content_type:?}"),
            }
            .into());
        }
        let bytes = field.bytes().await.map_err(|e| CoreError::InvalidInput {
            field: "proof".to_string(),
            reason: e.to_string(),
        })?;
        if bytes.len() > MAX_PROOF_BYTES {
            return Err(CoreError::InvalidInput {
                field: "proof".to_string(),
                reason: format!("upload of {} bytes exceeds the 5 MiB cap", bytes.len()),
            }
            .into());
        }
        let url = state
            .blob_store
            .store(bytes, &content_type)
            .await
            .map_err(CoreError::Internal)?;
        proof_url = Some(url);
    }

    let by = match caller.role {
        earnings_core::models::Role::Admin => MarkedPaidBy::Admin,
        _ => MarkedPaidBy::Rider,
    };

    let mut rng = SysRng::new();
    let payout = payout::mark_paid(
        &state.store,
        &mut rng,
        &payout_id,
        by,
        proof_url,
        rewards_used,
        UtcMillis::now(),
    )
    .await?;
    Ok(LxJson(PayoutView::from(payout)))
}

#[derive(Deserialize)]
pub struct GenerateRequest {
    pub week_start: UtcMillis,
}

#[derive(Serialize)]
pub struct GenerateResponse {
    pub payouts: Vec<PayoutView>,
}

/// The admin batch endpoint behind `generatePayoutsForWeek` (§4.7):
/// upserts every delivered order in the given week onto its rider's payout
/// document, for weeks a rider's own delivery traffic didn't already
/// trigger one.
pub async fn generate(
    State(state): State<Arc<AppState>>,
    LxJson(body): LxJson<GenerateRequest>,
) -> Result<LxJson<GenerateResponse>, ApiError> {
    let mut rng = SysRng::new();
    let payouts = payout::generate_payouts_for_week(
        &state.store,
        &mut rng,
        &state.settings,
        body.week_start,
    )
    .await?;
    Ok(LxJson(GenerateResponse {
        payouts: payouts.into_iter().map(PayoutView::from).collect(),
    }))
}
