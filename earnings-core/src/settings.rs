//! Engine-wide tunables that are not part of the promo config (those live
//! in [`crate::models::PromoConfig`] and are hot-swappable at runtime; these
//! are fixed for the process lifetime, mirroring the teacher's split between
//! `LexeArgs`-style static config and runtime-adjustable state).

use std::time::Duration;

use chrono_tz::Tz;
use rust_decimal::Decimal;

#[derive(Clone, Debug)]
pub struct Settings {
    /// The standard commission rate applied to a delivered order's gross
    /// amount, absent an active Gold Status discount (§4.3).
    pub commission_rate_percent: Decimal,

    /// The timezone a payout week's Sunday-00:00 boundaries are computed in
    /// (§4.7).
    pub payout_timezone: Tz,

    /// How long a rider may remain unpaid past `week_end` before entering
    /// the grace period's blocked phase (§4.8).
    pub payment_grace_period: Duration,

    /// How long a rider may remain blocked before a strike is recorded
    /// (§4.8, §4.9).
    pub strike_after: Duration,

    /// Number of strikes before an account is automatically deactivated
    /// (§4.9).
    pub strikes_before_deactivation: u32,

    /// How often the payment-window sweep runs (§4.8).
    pub sweep_interval: Duration,

    /// How many rider rows the sweep advances per tick (§4.8).
    pub sweep_batch_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            commission_rate_percent: Decimal::from(10),
            payout_timezone: chrono_tz::Africa::Lagos,
            payment_grace_period: Duration::from_secs(24 * 3_600),
            strike_after: Duration::from_secs(48 * 3_600),
            strikes_before_deactivation: 3,
            sweep_interval: Duration::from_secs(15 * 60),
            sweep_batch_size: 200,
        }
    }
}
