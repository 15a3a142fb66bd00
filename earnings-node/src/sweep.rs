//! The background sweep loop (§4.8, A7): periodically walks every rider,
//! enforcing the payment window and notifying lapsed Gold Status, then
//! sleeps for `settings.sweep_interval` or until shutdown, whichever comes
//! first. Breaking a rider's streak on decline/cancel (§4.5) happens inline
//! on the order-cancellation route the moment it's cancelled, not on this
//! timer, so it's not part of this sweep.

use std::sync::Arc;

use common::ids::UserId;
use common::shutdown::ShutdownChannel;
use common::task::LxTask;
use common::time::UtcMillis;
use earnings_api::state::AppState;
use earnings_core::gold_status;
use earnings_core::payment_window;
use earnings_core::store::Store;
use tracing::{error, info, instrument};

/// Spawns the sweep loop as a background task against the same
/// [`AppState`] the HTTP router serves, so an enforcement action taken by
/// one is immediately visible to the other. The returned [`LxTask`] must be
/// kept alive for the duration of the process.
pub fn spawn(app_state: Arc<AppState>, shutdown: ShutdownChannel) -> LxTask<()> {
    LxTask::spawn(async move {
        let mut cursor: Option<UserId> = None;
        let mut interval = tokio::time::interval(app_state.settings.sweep_interval);
        // The first tick fires immediately; skip it so startup doesn't race
        // the store being populated.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    run_one_tick(&app_state, &mut cursor).await;
                }
                () = shutdown.recv() => {
                    info!("payment-window sweep shutting down");
                    break;
                }
            }
        }
    })
}

#[instrument(skip_all, name = "(sweep-tick)")]
async fn run_one_tick(app_state: &AppState, cursor: &mut Option<UserId>) {
    let now = UtcMillis::now();
    let store = &app_state.store;
    let bus = &app_state.bus;
    let settings = &app_state.settings;

    match payment_window::sweep_tick(store, bus, settings, cursor.clone(), now).await {
        Ok(next) => *cursor = next,
        Err(e) => {
            error!(error = %e, "payment-window sweep tick failed");
            return;
        }
    }

    let riders = match store.list_rider_ids(None, settings.sweep_batch_size).await {
        Ok(riders) => riders,
        Err(e) => {
            error!(error = %e, "failed to list riders for gold-status expiry sweep");
            return;
        }
    };
    for rider_id in &riders {
        if let Err(e) = gold_status::notify_expired(store, bus, rider_id, now).await {
            error!(error = %e, rider = %rider_id, "gold-status expiry notification failed");
        }
    }
}
