//! The payment window controller (§4.8): pure window-classification
//! functions plus the periodic sweep that turns a window classification
//! into an enforcement action.

use common::ids::UserId;
use common::money::Money;
use common::time::UtcMillis;

use crate::enforcement;
use crate::error::CoreError;
use crate::event_bus::EventBus;
use crate::models::PayoutStatus;
use crate::settings::Settings;
use crate::store::Store;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum WindowState {
    /// Payout isn't due yet, or has already been paid.
    Ok,
    /// Past `week_end` but still inside the grace period.
    Grace,
    /// Past the grace period: payments should be blocked.
    Blocked,
    /// Past the grace period for long enough to earn a strike.
    Strikeworthy,
}

/// Classifies a single payout's window state as of `now`. Pure and
/// deterministic so it's directly unit- and property-testable without a
/// store. Depends only on `(week_end, commission, now, payout_status)`
/// (§8 invariant 5): a payout with nothing owed is never due, regardless of
/// how overdue its week is.
pub fn classify(
    payout_status: PayoutStatus,
    week_end: UtcMillis,
    commission: Money,
    settings: &Settings,
    now: UtcMillis,
) -> WindowState {
    if payout_status == PayoutStatus::Paid || commission.is_zero() {
        return WindowState::Ok;
    }
    if now.as_i64() < week_end.as_i64() {
        return WindowState::Ok;
    }
    let overdue_millis = now.as_i64() - week_end.as_i64();
    let grace_millis = settings.payment_grace_period.as_millis() as i64;
    let strike_millis = grace_millis + settings.strike_after.as_millis() as i64;

    if overdue_millis < grace_millis {
        WindowState::Grace
    } else if overdue_millis < strike_millis {
        WindowState::Blocked
    } else {
        WindowState::Strikeworthy
    }
}

/// Runs one sweep pass starting just after `cursor`, over up to
/// `settings.sweep_batch_size` riders, applying the enforcement action each
/// rider's overdue payouts call for. Returns the cursor to resume from on
/// the next tick, or `None` once the pass has reached the end of the rider
/// list (the next tick then starts over from the beginning).
pub async fn sweep_tick(
    store: &impl Store,
    bus: &EventBus,
    settings: &Settings,
    cursor: Option<UserId>,
    now: UtcMillis,
) -> Result<Option<UserId>, CoreError> {
    let riders = store
        .list_rider_ids(cursor.as_ref(), settings.sweep_batch_size)
        .await?;
    let next_cursor = riders.last().cloned();

    for rider_id in &riders {
        let payouts = store.list_payouts_for_rider(rider_id).await?;
        let worst = payouts
            .iter()
            .filter(|p| p.status == PayoutStatus::Pending)
            .map(|p| classify(p.status, p.week_end, p.totals.commission, settings, now))
            .max_by_key(|state| match state {
                WindowState::Ok => 0,
                WindowState::Grace => 1,
                WindowState::Blocked => 2,
                WindowState::Strikeworthy => 3,
            });

        match worst {
            Some(WindowState::Blocked) => {
                enforcement::block_for_nonpayment(
                    store,
                    bus,
                    rider_id,
                    "payout overdue beyond the grace period".to_string(),
                    now,
                )
                .await?;
            }
            Some(WindowState::Strikeworthy) => {
                enforcement::block_for_nonpayment(
                    store,
                    bus,
                    rider_id,
                    "payout overdue beyond the grace period".to_string(),
                    now,
                )
                .await?;
                if let Some(payout) = payouts
                    .iter()
                    .find(|p| p.status == PayoutStatus::Pending)
                {
                    enforcement::add_strike(
                        store,
                        bus,
                        settings,
                        rider_id,
                        "payout overdue beyond the strike window".to_string(),
                        payout.id.clone(),
                        now,
                    )
                    .await?;
                }
            }
            Some(WindowState::Ok) | Some(WindowState::Grace) | None => {}
        }
    }

    if riders.len() < settings.sweep_batch_size {
        Ok(None)
    } else {
        Ok(next_cursor)
    }
}
