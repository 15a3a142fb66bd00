//! The payout aggregator (§4.7): groups a rider's delivered orders into
//! weekly documents, keyed by the Sunday-00:00-local week they fall in.

use std::time::Duration;

use chrono::{Datelike, Duration as ChronoDuration, TimeZone, Utc};
use chrono_tz::Tz;
use serde_json::json;

use common::ids::{OrderId, PayoutId, UserId};
use common::money::Money;
use common::rng::{random_base36, Crng};
use common::time::UtcMillis;

use crate::error::CoreError;
use crate::models::{
    Financial, MarkedPaidBy, PayoutOrderSnapshot, PayoutStatus, PayoutTotals, RiderPayout,
    ServiceType, TransactionType,
};
use crate::settings::Settings;
use crate::store::Store;
use crate::wallet;

/// Returns `[week_start, week_end)` for the week `at` falls in, in `tz`:
/// Sunday 00:00 local through the following Sunday 00:00 local.
pub fn week_range(at: UtcMillis, tz: Tz) -> (UtcMillis, UtcMillis) {
    let local = at.to_datetime().with_timezone(&tz);
    let days_since_sunday = local.weekday().num_days_from_sunday() as i64;
    let start_date = local.date_naive() - ChronoDuration::days(days_since_sunday);
    let start_naive = start_date.and_hms_opt(0, 0, 0).expect("midnight is always valid");

    let start_local = tz
        .from_local_datetime(&start_naive)
        .earliest()
        .expect("week start is a valid local time");
    let end_local = start_local + ChronoDuration::days(7);

    let week_start = UtcMillis::from_datetime(start_local.with_timezone(&Utc));
    let week_end = UtcMillis::from_datetime(end_local.with_timezone(&Utc));
    (week_start, week_end)
}

/// How many times to regenerate and retry on a reference-code collision
/// before giving up. Collisions require the same rider, the same
/// six-digit slice of the generation timestamp, and the same two random
/// characters -- astronomically unlikely, but the retry exists so a
/// theoretical collision fails closed instead of silently overwriting an
/// existing payout's code.
const REFERENCE_CODE_MAX_ATTEMPTS: u32 = 5;

/// A unique, human-legible payment reference code stamped on offline
/// transfer receipts (§4.7): `9W` plus the last six hex characters of the
/// rider's id, six digits sliced off the generation timestamp, and two
/// random base36 characters.
fn reference_code(rng: &mut impl Crng, rider_id: &UserId, generated_at: UtcMillis) -> String {
    let hex = rider_id.as_str();
    let rider6 = hex[hex.len().saturating_sub(6)..].to_uppercase();
    let ts6 = format!("{:06}", generated_at.as_i64().rem_euclid(1_000_000));
    let rand2 = random_base36(rng, 2);
    format!("9W{rider6}{ts6}{rand2}")
}

/// Generates a [`reference_code`] and atomically reserves it against
/// `store`, regenerating on collision up to [`REFERENCE_CODE_MAX_ATTEMPTS`]
/// times.
async fn reserve_reference_code(
    store: &impl Store,
    rng: &mut impl Crng,
    rider_id: &UserId,
    generated_at: UtcMillis,
) -> Result<String, CoreError> {
    for _ in 0..REFERENCE_CODE_MAX_ATTEMPTS {
        let code = reference_code(rng, rider_id, generated_at);
        if store.try_reserve_payment_reference_code(&code).await? {
            return Ok(code);
        }
    }
    Err(CoreError::Internal(anyhow::anyhow!(
        "could not generate a unique payment reference code for rider {rider_id} after {REFERENCE_CODE_MAX_ATTEMPTS} attempts"
    )))
}

/// Appends a just-delivered order's commission split onto the rider's
/// payout document for the week it falls in, creating that document on
/// first use. Totals are always recomputed from scratch over every order
/// in the payout (§8 invariant 1), never adjusted incrementally. Idempotent
/// per `order_id`, so a replayed delivery event never double-counts.
pub async fn upsert_for_delivery(
    store: &impl Store,
    rng: &mut impl Crng,
    settings: &Settings,
    rider_id: &UserId,
    order_id: OrderId,
    service_type: ServiceType,
    financial: &Financial,
    delivered_at: UtcMillis,
) -> Result<RiderPayout, CoreError> {
    let (week_start, week_end) = week_range(delivered_at, settings.payout_timezone);

    let payout_id = match store.find_open_payout(rider_id, week_start).await? {
        Some(existing) => existing.id,
        None => {
            let id = PayoutId::generate(rng);
            let payment_reference_code =
                reserve_reference_code(store, rng, rider_id, delivered_at).await?;
            store
                .insert_payout(RiderPayout {
                    id: id.clone(),
                    rider_id: rider_id.clone(),
                    week_start,
                    week_end,
                    orders: Vec::new(),
                    totals: PayoutTotals::default(),
                    status: PayoutStatus::Pending,
                    paid_at: None,
                    marked_paid_by: None,
                    payment_proof_url: None,
                    payment_reference_code,
                    paystack_payment: None,
                    rewards_used: Money::ZERO,
                })
                .await?;
            id
        }
    };

    let snapshot = PayoutOrderSnapshot {
        order_id: order_id.clone(),
        delivered_at,
        gross: financial.gross_amount,
        commission: financial.commission_amount,
        rider_net: financial.rider_net_amount,
        service_type,
    };

    store
        .transact_payout(&payout_id, move |payout| {
            if payout.contains_order(&order_id) {
                return Ok(());
            }
            payout.orders.push(snapshot);
            payout.totals = PayoutTotals::recompute(&payout.orders);
            Ok(())
        })
        .await?;

    store.get_payout(&payout_id).await
}

/// Marks a payout paid. `proof_url` is required unless `by` is
/// [`MarkedPaidBy::Psp`] (an automated gateway confirmation carries its own
/// evidence in `paystack_payment`). `rewards_used` offsets the commission
/// owed against whatever the rider has already earned in referral/streak
/// rewards (§4.2, §4.7 glossary entry for "Payout"): that amount is debited
/// from the rider's wallet as a [`TransactionType::CommissionDebit`] before
/// the payout is marked paid, so a rider who settles partly in rewards
/// never remits more than `totals.commission - rewards_used`.
#[allow(clippy::too_many_arguments)]
pub async fn mark_paid(
    store: &impl Store,
    rng: &mut impl Crng,
    payout_id: &PayoutId,
    by: MarkedPaidBy,
    proof_url: Option<String>,
    rewards_used: Money,
    now: UtcMillis,
) -> Result<RiderPayout, CoreError> {
    let payout = store.get_payout(payout_id).await?;
    if payout.status == PayoutStatus::Paid {
        return Err(CoreError::InvalidPayoutState {
            payout: payout.id.clone(),
            status: "already paid".to_string(),
        });
    }

    if !rewards_used.is_zero() {
        wallet::debit(
            store,
            rng,
            &payout.rider_id,
            TransactionType::CommissionDebit,
            rewards_used,
            None,
            json!({ "payout": payout_id }),
            now,
        )
        .await?;
    }

    store
        .transact_payout(payout_id, move |payout| {
            if payout.status == PayoutStatus::Paid {
                return Err(CoreError::InvalidPayoutState {
                    payout: payout.id.clone(),
                    status: "already paid".to_string(),
                });
            }
            payout.status = PayoutStatus::Paid;
            payout.paid_at = Some(now);
            payout.marked_paid_by = Some(by);
            payout.payment_proof_url = proof_url;
            payout.rewards_used = rewards_used;
            Ok(payout.clone())
        })
        .await
}

/// The admin batch operation behind `generatePayoutsForWeek` (§4.7): scans
/// every order delivered in `[week_start, week_start + 7d)` and upserts
/// each one onto its rider's weekly payout document. Safe to call more than
/// once for the same week -- `upsert_for_delivery` is idempotent per
/// `order_id`, so a rerun after new deliveries land only adds the new ones.
pub async fn generate_payouts_for_week(
    store: &impl Store,
    rng: &mut impl Crng,
    settings: &Settings,
    week_start: UtcMillis,
) -> Result<Vec<RiderPayout>, CoreError> {
    let week_end = week_start.saturating_add(Duration::from_secs(7 * 86_400));
    let orders = store
        .list_delivered_orders_in_range(week_start, week_end)
        .await?;

    let mut payouts = Vec::new();
    for order in orders {
        let (Some(rider_id), Some(financial), Some(delivered_at)) =
            (order.rider_id, order.financial, order.delivered_at)
        else {
            continue;
        };
        let payout = upsert_for_delivery(
            store,
            rng,
            settings,
            &rider_id,
            order.id,
            order.service_type,
            &financial,
            delivered_at,
        )
        .await?;
        payouts.push(payout);
    }
    Ok(payouts)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mem_store::MemStore;
    use common::rng::SysRng;

    #[test]
    fn week_range_starts_on_sunday_midnight_local() {
        // 2024-01-10 is a Wednesday.
        let wednesday = UtcMillis::from_datetime(
            chrono::DateTime::parse_from_rfc3339("2024-01-10T12:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        );
        let (start, end) = week_range(wednesday, chrono_tz::Africa::Lagos);
        let start_local = start.to_datetime().with_timezone(&chrono_tz::Africa::Lagos);
        assert_eq!(start_local.weekday(), chrono::Weekday::Sun);
        assert_eq!(start_local.format("%H:%M:%S").to_string(), "00:00:00");
        assert_eq!((end.as_i64() - start.as_i64()) / 1000 / 86_400, 7);
    }

    #[tokio::test]
    async fn replayed_order_does_not_double_count_totals() {
        let store = MemStore::new();
        let settings = Settings::default();
        let mut rng = SysRng::new();
        let rider_id = UserId::generate(&mut rng);
        let order_id = OrderId::generate(&mut rng);
        let financial = Financial {
            gross_amount: Money::from_minor_units(10_000),
            commission_rate_pct: rust_decimal::Decimal::from(10),
            commission_amount: Money::from_minor_units(1_000),
            rider_net_amount: Money::from_minor_units(9_000),
        };
        let now = UtcMillis::now();

        for _ in 0..2 {
            upsert_for_delivery(
                &store,
                &mut rng,
                &settings,
                &rider_id,
                order_id.clone(),
                ServiceType::Courier,
                &financial,
                now,
            )
            .await
            .unwrap();
        }

        let payout = store
            .find_open_payout(&rider_id, week_range(now, settings.payout_timezone).0)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payout.totals.count, 1);
        assert_eq!(payout.totals.rider_net, Money::from_minor_units(9_000));
    }

    #[test]
    fn reference_code_matches_expected_shape() {
        let mut rng = SysRng::new();
        let rider_id = UserId::generate(&mut rng);
        let code = reference_code(&mut rng, &rider_id, UtcMillis::from_millis(1_700_123_456_789));
        assert_eq!(code.len(), 2 + 6 + 6 + 2);
        assert!(code.starts_with("9W"));
        let rider6 = &rider_id.as_str()[rider_id.as_str().len() - 6..].to_uppercase();
        assert_eq!(&code[2..8], rider6.as_str());
        assert_eq!(&code[8..14], "123456");
        assert!(code[14..16].chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[tokio::test]
    async fn mark_paid_with_rewards_used_debits_wallet_as_commission_debit() {
        use crate::models::{MarkedPaidBy, Role, User};

        let store = MemStore::new();
        let mut rng = SysRng::new();
        let settings = Settings::default();
        let rider_id = UserId::generate(&mut rng);
        store
            .insert_user(User::new(rider_id.clone(), Role::Rider, "R9".into()))
            .await
            .unwrap();

        wallet::credit(
            &store,
            &mut rng,
            &rider_id,
            TransactionType::StreakBonus,
            Money::from_minor_units(5_000),
            None,
            None,
            serde_json::Value::Null,
            UtcMillis::from_millis(0),
        )
        .await
        .unwrap();

        let order_id = OrderId::generate(&mut rng);
        let financial = Financial {
            gross_amount: Money::from_minor_units(10_000),
            commission_rate_pct: rust_decimal::Decimal::from(10),
            commission_amount: Money::from_minor_units(1_000),
            rider_net_amount: Money::from_minor_units(9_000),
        };
        let now = UtcMillis::now();
        let payout = upsert_for_delivery(
            &store,
            &mut rng,
            &settings,
            &rider_id,
            order_id,
            ServiceType::Courier,
            &financial,
            now,
        )
        .await
        .unwrap();

        let paid = mark_paid(
            &store,
            &mut rng,
            &payout.id,
            MarkedPaidBy::Admin,
            Some("https://proof".to_string()),
            Money::from_minor_units(5_000),
            now,
        )
        .await
        .unwrap();

        assert_eq!(paid.rewards_used, Money::from_minor_units(5_000));
        let wallet = store.get_wallet(&rider_id).await.unwrap();
        assert!(wallet.balance.is_zero());
        assert!(wallet
            .transactions
            .iter()
            .any(|t| t.kind == TransactionType::CommissionDebit));
    }
}
