//! Quantified invariant properties (§8): each is a `proptest` property
//! replayed against a fresh [`MemStore`] + engine set, checked after every
//! event in the generated sequence rather than only at the end.

use proptest::prelude::*;
use rust_decimal::Decimal;

use common::ids::{OrderId, UserId};
use common::money::Money;
use common::rng::SysRng;
use common::time::UtcMillis;
use earnings_core::event_bus::EventBus;
use earnings_core::mem_store::MemStore;
use earnings_core::models::{
    Financial, GoldStatusConfig, PayoutStatus, PayoutTotals, ReferralConfig, Role, ServiceType,
    TransactionType, User,
};
use earnings_core::payment_window::{classify, WindowState};
use earnings_core::promo_config::PromoConfigStore;
use earnings_core::settings::Settings;
use earnings_core::store::Store;
use earnings_core::{commission, enforcement, gold_status, payout, referral, wallet};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap()
}

async fn make_rider(store: &MemStore, code: &str) -> UserId {
    let mut rng = SysRng::new();
    let id = UserId::generate(&mut rng);
    store
        .insert_user(User::new(id.clone(), Role::Rider, code.to_string()))
        .await
        .unwrap();
    id
}

/// Invariant 1: a payout's `totals` always equal a from-scratch recompute
/// over `orders`, after every delivery in the sequence, not just the last.
async fn check_payout_totals_consistency(prices: Vec<i64>) {
    let store = MemStore::new();
    let settings = Settings::default();
    let mut rng = SysRng::new();
    let rider_id = make_rider(&store, "INV1").await;

    for price_minor in prices {
        let gross = Money::from_minor_units(price_minor);
        let commission = gross.checked_mul_percent(Decimal::from(10)).unwrap();
        let rider_net = gross.checked_sub(commission).unwrap();
        let financial = Financial {
            gross_amount: gross,
            commission_rate_pct: Decimal::from(10),
            commission_amount: commission,
            rider_net_amount: rider_net,
        };
        let order_id = OrderId::generate(&mut rng);
        let recorded = payout::upsert_for_delivery(
            &store,
            &mut rng,
            &settings,
            &rider_id,
            order_id,
            ServiceType::Courier,
            &financial,
            UtcMillis::now(),
        )
        .await
        .unwrap();

        let recomputed = PayoutTotals::recompute(&recorded.orders);
        assert_eq!(recorded.totals.gross, recomputed.gross);
        assert_eq!(recorded.totals.commission, recomputed.commission);
        assert_eq!(recorded.totals.rider_net, recomputed.rider_net);
        assert_eq!(recorded.totals.count, recorded.orders.len() as u64);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]
    #[test]
    fn payout_totals_always_match_sum_of_orders(
        prices in proptest::collection::vec(100_i64..=500_000, 0..12),
    ) {
        let rt = runtime();
        rt.block_on(check_payout_totals_consistency(prices));
    }
}

/// Invariant 2: a wallet's balance always equals the sum of its `Completed`
/// transaction amounts, after every credit/debit in the sequence.
async fn check_wallet_conservation(ops: Vec<(bool, i64)>) {
    let store = MemStore::new();
    let mut rng = SysRng::new();
    let rider_id = make_rider(&store, "INV2").await;

    for (is_credit, amount_minor) in ops {
        let amount = Money::from_minor_units(amount_minor);
        let result = if is_credit {
            wallet::credit(
                &store,
                &mut rng,
                &rider_id,
                TransactionType::Adjustment,
                amount,
                None,
                None,
                serde_json::Value::Null,
                UtcMillis::now(),
            )
            .await
        } else {
            wallet::debit(
                &store,
                &mut rng,
                &rider_id,
                TransactionType::Adjustment,
                amount,
                None,
                serde_json::Value::Null,
                UtcMillis::now(),
            )
            .await
        };
        // A rejected debit (insufficient funds) leaves the wallet untouched;
        // the invariant must still hold on every step, successful or not.
        let _ = result;
        let wallet = store.get_wallet(&rider_id).await.unwrap();
        assert_eq!(wallet::recomputed_balance(&wallet), Some(wallet.balance));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]
    #[test]
    fn wallet_balance_always_equals_transaction_sum(
        ops in proptest::collection::vec((any::<bool>(), 1_i64..=200_000), 0..16),
    ) {
        let rt = runtime();
        rt.block_on(check_wallet_conservation(ops));
    }
}

/// Invariant 3: a referral is paid at most once, regardless of how many
/// times `record_trip_and_maybe_reward` is replayed past the threshold.
async fn check_referral_paid_at_most_once(extra_calls: u32) {
    let store = MemStore::new();
    let bus = EventBus::new();
    let promo_config = PromoConfigStore::default();
    let mut rng = SysRng::new();

    promo_config.update_referral(
        ReferralConfig {
            enabled: true,
            reward_amount: Money::from_minor_units(100_000),
            required_trips: 3,
        },
        UtcMillis::from_millis(0),
        "admin".parse().unwrap(),
    );

    let referrer = make_rider(&store, "INV3R").await;
    let referee = make_rider(&store, "INV3E").await;
    referral::claim(&store, &mut rng, &referee, "INV3R", UtcMillis::from_millis(0))
        .await
        .unwrap();

    let total_calls = 3 + extra_calls;
    for i in 0..total_calls {
        referral::record_trip_and_maybe_reward(
            &store,
            &mut rng,
            &bus,
            &promo_config,
            &referee,
            UtcMillis::from_millis(i as i64),
        )
        .await
        .unwrap();

        let referral_record = store.find_referral_by_referred(&referee).await.unwrap().unwrap();
        let wallet = store.get_wallet(&referrer).await.unwrap();
        let reward_txns = wallet
            .transactions
            .iter()
            .filter(|t| t.kind == TransactionType::ReferralReward)
            .count();
        assert!(reward_txns <= 1);
        assert_eq!(referral_record.reward_paid, reward_txns == 1);
        if referral_record.reward_paid {
            assert_eq!(wallet.balance, Money::from_minor_units(100_000));
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]
    #[test]
    fn referral_reward_never_pays_twice(extra_calls in 0_u32..15) {
        let rt = runtime();
        rt.block_on(check_referral_paid_at_most_once(extra_calls));
    }
}

/// Invariant 4: while Gold Status is active, the commission charged is
/// always within `[0, gross * ratePct / 100]` for the base rate.
async fn check_gold_discount_bound(discount_percent: i64, gross_minor: i64) {
    let store = MemStore::new();
    let promo_config = PromoConfigStore::default();
    let settings = Settings::default();
    let mut rng = SysRng::new();

    promo_config.update_gold_status(
        GoldStatusConfig {
            enabled: true,
            required_rides: 1,
            window_days: 10,
            duration_days: 30,
            discount_percent: Decimal::from(discount_percent),
        },
        UtcMillis::from_millis(0),
        "admin".parse().unwrap(),
    );

    let rider_id = make_rider(&store, "INV4").await;
    let customer_id = make_rider(&store, "INV4C").await;
    let now = UtcMillis::from_millis(0);

    let order_id = OrderId::generate(&mut rng);
    store
        .insert_order(earnings_core::models::Order::new(
            order_id.clone(),
            customer_id,
            ServiceType::Ride,
            Money::from_minor_units(gross_minor),
        ))
        .await
        .unwrap();
    commission::deliver_and_split(
        &store,
        &promo_config,
        &settings,
        &order_id,
        &rider_id,
        now,
    )
    .await
    .unwrap();

    let rider = store.get_user(&rider_id).await.unwrap();
    let bus = earnings_core::event_bus::EventBus::new();
    gold_status::record_delivery_and_maybe_unlock(
        &store,
        &bus,
        &promo_config,
        &settings,
        &rider_id,
        ServiceType::Ride,
        now,
    )
    .await
    .unwrap();
    let _ = rider;
    let rider = store.get_user(&rider_id).await.unwrap();
    assert!(rider.gold_status.is_active(now));

    let gross = Money::from_minor_units(gross_minor);
    let upper_bound = gross
        .checked_mul_percent(settings.commission_rate_percent)
        .unwrap();
    let pct = gold_status::effective_commission_pct(&rider, &promo_config, &settings, now);
    let commission = gross.checked_mul_percent(pct).unwrap();

    assert!(commission.as_decimal() >= Decimal::ZERO);
    assert!(commission.as_decimal() <= upper_bound.as_decimal());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]
    #[test]
    fn gold_discount_never_exceeds_base_rate_commission(
        discount_percent in 0_i64..=100,
        gross_minor in 100_i64..=10_000_000,
    ) {
        let rt = runtime();
        rt.block_on(check_gold_discount_bound(discount_percent, gross_minor));
    }
}

/// Invariant 5: the window classification is a pure function of
/// `(week_end, commission, now, status)` — calling it twice with identical
/// inputs always agrees, and a zero commission or a paid payout is always
/// `Ok` no matter how overdue `now` is.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]
    #[test]
    fn window_classification_is_pure(
        status_is_paid in any::<bool>(),
        week_end_millis in 0_i64..=10_000_000_000,
        commission_minor in 0_i64..=1_000_000,
        now_millis in 0_i64..=10_000_000_000,
    ) {
        let settings = Settings::default();
        let status = if status_is_paid {
            PayoutStatus::Paid
        } else {
            PayoutStatus::Pending
        };
        let week_end = UtcMillis::from_millis(week_end_millis);
        let now = UtcMillis::from_millis(now_millis);
        let commission = Money::from_minor_units(commission_minor);

        let a = classify(status, week_end, commission, &settings, now);
        let b = classify(status, week_end, commission, &settings, now);
        prop_assert_eq!(a, b);

        if status_is_paid || commission.is_zero() {
            prop_assert_eq!(a, WindowState::Ok);
        }
    }
}

/// Invariant 6: once deactivated, a rider stays blocked from further
/// activity until `reactivate` is explicitly called, regardless of
/// interleaved `block`/`unblock`/strike calls.
async fn check_deactivation_terminality(post_deactivate_unblocks: u32) {
    let store = MemStore::new();
    let bus = EventBus::new();
    let rider_id = make_rider(&store, "INV6").await;

    enforcement::deactivate(&store, &bus, &rider_id, "test".to_string(), UtcMillis::from_millis(0))
        .await
        .unwrap();

    for _ in 0..post_deactivate_unblocks {
        enforcement::unblock(&store, &rider_id).await.unwrap();
        let err = enforcement::assert_not_blocked(&store, &rider_id).await.unwrap_err();
        assert!(matches!(err, earnings_core::error::CoreError::RiderDeactivated { .. }));
    }

    enforcement::reactivate(&store, &rider_id, false).await.unwrap();
    // Reactivation clears the deactivation flag; a rider with no outstanding
    // payment block is no longer stopped by `assert_not_blocked`.
    enforcement::assert_not_blocked(&store, &rider_id).await.unwrap();
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]
    #[test]
    fn deactivated_rider_stays_blocked_until_reactivated(post_deactivate_unblocks in 0_u32..5) {
        let rt = runtime();
        rt.block_on(check_deactivation_terminality(post_deactivate_unblocks));
    }
}

/// Invariant 7: replaying the same delivery, `mark_paid`, or enforcement
/// action any number of extra times never changes the already-settled state.
async fn check_idempotence(extra_delivery_replays: u32, extra_block_replays: u32) {
    let store = MemStore::new();
    let bus = EventBus::new();
    let settings = Settings::default();
    let mut rng = SysRng::new();
    let rider_id = make_rider(&store, "INV7").await;

    let financial = Financial {
        gross_amount: Money::from_minor_units(10_000),
        commission_rate_pct: Decimal::from(10),
        commission_amount: Money::from_minor_units(1_000),
        rider_net_amount: Money::from_minor_units(9_000),
    };
    let order_id = OrderId::generate(&mut rng);
    let first = payout::upsert_for_delivery(
        &store,
        &mut rng,
        &settings,
        &rider_id,
        order_id.clone(),
        ServiceType::Courier,
        &financial,
        UtcMillis::from_millis(0),
    )
    .await
    .unwrap();

    for _ in 0..extra_delivery_replays {
        let replayed = payout::upsert_for_delivery(
            &store,
            &mut rng,
            &settings,
            &rider_id,
            order_id.clone(),
            ServiceType::Courier,
            &financial,
            UtcMillis::from_millis(0),
        )
        .await
        .unwrap();
        assert_eq!(replayed.orders.len(), first.orders.len());
        assert_eq!(replayed.totals.gross, first.totals.gross);
    }

    let paid = payout::mark_paid(
        &store,
        &mut rng,
        &first.id,
        earnings_core::models::MarkedPaidBy::Admin,
        None,
        Money::ZERO,
        UtcMillis::from_millis(10),
    )
    .await
    .unwrap();
    let paid_at = paid.paid_at;
    let repeat = payout::mark_paid(
        &store,
        &mut rng,
        &first.id,
        earnings_core::models::MarkedPaidBy::Admin,
        None,
        Money::ZERO,
        UtcMillis::from_millis(20),
    )
    .await;
    assert!(repeat.is_err());
    let reread = store.get_payout(&first.id).await.unwrap();
    assert_eq!(reread.paid_at, paid_at);

    enforcement::block_for_nonpayment(&store, &bus, &rider_id, "r".to_string(), UtcMillis::from_millis(0))
        .await
        .unwrap();
    let blocked_at_first = store.get_user(&rider_id).await.unwrap().payment_blocked_at;
    for _ in 0..extra_block_replays {
        enforcement::block_for_nonpayment(&store, &bus, &rider_id, "r".to_string(), UtcMillis::from_millis(999))
            .await
            .unwrap();
        let user = store.get_user(&rider_id).await.unwrap();
        assert!(user.payment_blocked);
        assert_eq!(user.payment_blocked_at, blocked_at_first);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]
    #[test]
    fn replayed_operations_never_change_settled_state(
        extra_delivery_replays in 0_u32..5,
        extra_block_replays in 0_u32..5,
    ) {
        let rt = runtime();
        rt.block_on(check_idempotence(extra_delivery_replays, extra_block_replays));
    }
}
