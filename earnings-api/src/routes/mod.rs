mod admin_promo;
mod admin_riders;
mod orders;
mod payouts;
mod referral;
mod rider;

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;
use earnings_core::models::Role;

use crate::auth::require_role;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router<()> {
    let admin = Router::new()
        .route("/promo-config", get(admin_promo::get_config))
        .route("/promo-config/referral", put(admin_promo::put_referral))
        .route("/promo-config/streak", put(admin_promo::put_streak))
        .route("/promo-config/gold-status", put(admin_promo::put_gold_status))
        .route("/promos/toggle-all", post(admin_promo::toggle_all))
        .route("/riders/{rider_id}/block", post(admin_riders::block))
        .route("/riders/{rider_id}/unblock", post(admin_riders::unblock))
        .route("/riders/{rider_id}/strike", post(admin_riders::strike))
        .route("/riders/{rider_id}/deactivate", post(admin_riders::deactivate))
        .route("/riders/{rider_id}/reactivate", post(admin_riders::reactivate))
        .route("/payouts/generate", post(payouts::generate))
        .route_layer(axum::middleware::from_fn(|req, next| {
            require_role(Role::Admin, req, next)
        }));

    Router::new()
        .route("/orders/{order_id}/accept", post(orders::accept))
        .route("/orders/{order_id}/cancel", post(orders::cancel))
        .route("/orders/{order_id}/deliver", post(orders::deliver))
        .route("/rider/earnings", get(rider::earnings))
        .route("/referral/use", post(referral::claim))
        .route("/referral/stats", get(referral::stats))
        .route("/payouts", get(payouts::list_mine))
        .route("/payouts/{payout_id}/mark-paid", post(payouts::mark_paid))
        .nest("/admin", admin)
        .with_state(state)
}
