//! The referral engine (§4.4): a rider claims a referrer's code once, and
//! once they've completed enough trips the referrer is paid a one-time
//! reward.

use common::ids::{ReferralId, TransactionId, UserId};
use common::money::Money;
use common::rng::Crng;
use common::time::UtcMillis;
use serde_json::json;

use crate::error::CoreError;
use crate::event_bus::{DomainEvent, EventBus};
use crate::models::{Referral, TransactionType};
use crate::promo_config::PromoConfigStore;
use crate::store::Store;
use crate::wallet;

/// Claims `code` on behalf of `referee_id`, creating the `Referral` record.
/// The uniqueness check happens twice: once as an early, friendly rejection,
/// and again inside the referee's row lock so two concurrent claims can
/// never both succeed (§4.4 edge case).
pub async fn claim(
    store: &impl Store,
    rng: &mut impl Crng,
    referee_id: &UserId,
    code: &str,
    now: UtcMillis,
) -> Result<Referral, CoreError> {
    let referrer = store
        .find_user_by_referral_code(code)
        .await?
        .ok_or_else(|| CoreError::UnknownReferralCode {
            code: code.to_string(),
        })?;
    if referrer.id == *referee_id {
        return Err(CoreError::SelfReferral {
            user: referee_id.clone(),
        });
    }
    if store.find_referral_by_referred(referee_id).await?.is_some() {
        return Err(CoreError::AlreadyReferred {
            user: referee_id.clone(),
        });
    }

    let referrer_id = referrer.id.clone();
    store
        .transact_user(referee_id, move |user| {
            if user.referred_by.is_some() {
                return Err(CoreError::AlreadyReferred {
                    user: user.id.clone(),
                });
            }
            user.referred_by = Some(referrer_id);
            Ok(())
        })
        .await?;

    let referral = Referral {
        id: ReferralId::generate(rng),
        referrer_id: referrer.id,
        referred_user_id: referee_id.clone(),
        referral_code: code.to_string(),
        completed_trips: 0,
        reward_amount: Money::ZERO,
        reward_paid: false,
        paid_at: None,
        transaction_id: None,
    };
    store.insert_referral(referral.clone()).await?;
    Ok(referral)
}

/// Called once per delivered order for each trip-taking participant who
/// might be the `referredUserId` of an unpaid referral -- the customer, and
/// the rider too when they're a distinct person who was themselves referred
/// (§4.4 step 3). A no-op for anyone with no pending referral. Advances
/// that referral's completed-trip count and, once the threshold is met,
/// pays the referrer exactly once.
pub async fn record_trip_and_maybe_reward(
    store: &impl Store,
    rng: &mut impl Crng,
    bus: &EventBus,
    promo_config: &PromoConfigStore,
    participant_id: &UserId,
    now: UtcMillis,
) -> Result<(), CoreError> {
    let Some(referral) = store.find_referral_by_referred(participant_id).await? else {
        return Ok(());
    };
    if referral.reward_paid {
        return Ok(());
    }
    let config = promo_config.get().referral;
    if !config.enabled {
        return Ok(());
    }

    let completed = store
        .transact_referral(&referral.id, |r| {
            r.completed_trips += 1;
            Ok(r.completed_trips)
        })
        .await?;

    if completed < u64::from(config.required_trips) {
        return Ok(());
    }

    let reward_amount = config.reward_amount;
    let should_pay = store
        .transact_referral(&referral.id, move |r| {
            if r.reward_paid {
                return Ok(false);
            }
            r.reward_paid = true;
            r.reward_amount = reward_amount;
            r.paid_at = Some(now);
            Ok(true)
        })
        .await?;

    if !should_pay {
        return Ok(());
    }

    let txn_id = TransactionId::generate(rng);
    let referral_id = referral.id.clone();
    let referred_user_id = referral.referred_user_id.clone();
    store
        .transact_wallet_and_user(&referral.referrer_id, move |wallet, referrer| {
            wallet::apply(
                wallet,
                txn_id,
                referrer.id.clone(),
                TransactionType::ReferralReward,
                reward_amount.as_decimal(),
                None,
                Some(referral_id),
                json!({ "referred": referred_user_id }),
                now,
            )?;
            referrer.referral_reward_earned = referrer
                .referral_reward_earned
                .checked_add(reward_amount)
                .ok_or_else(|| CoreError::InvalidInput {
                    field: "referral_reward_earned".to_string(),
                    reason: "overflowed".to_string(),
                })?;
            Ok(())
        })
        .await?;

    bus.publish(DomainEvent::ReferralRewarded {
        referral: referral.id,
        referrer: referral.referrer_id,
        referred: referral.referred_user_id,
        amount: reward_amount,
    })
    .await;

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mem_store::MemStore;
    use crate::models::{Role, User};
    use common::rng::SysRng;

    async fn make_user(store: &MemStore, code: &str) -> UserId {
        let mut rng = SysRng::new();
        let id = UserId::generate(&mut rng);
        store
            .insert_user(User::new(id.clone(), Role::Rider, code.to_string()))
            .await
            .unwrap();
        id
    }

    #[tokio::test]
    async fn claim_rejects_self_referral() {
        let store = MemStore::new();
        let mut rng = SysRng::new();
        let id = make_user(&store, "SELF1").await;
        let err = claim(&store, &mut rng, &id, "SELF1", UtcMillis::from_millis(0))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::SelfReferral { .. }));
    }

    #[tokio::test]
    async fn claim_rejects_unknown_code() {
        let store = MemStore::new();
        let mut rng = SysRng::new();
        let id = make_user(&store, "X1").await;
        let err = claim(&store, &mut rng, &id, "NOPE", UtcMillis::from_millis(0))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::UnknownReferralCode { .. }));
    }

    #[tokio::test]
    async fn reward_pays_once_threshold_reached() {
        let store = MemStore::new();
        let bus = EventBus::new();
        let promo_config = PromoConfigStore::default();
        let mut rng = SysRng::new();

        let referrer_id = make_user(&store, "REF1").await;
        let referee_id = make_user(&store, "REF2").await;
        claim(
            &store,
            &mut rng,
            &referee_id,
            "REF1",
            UtcMillis::from_millis(0),
        )
        .await
        .unwrap();

        let required = promo_config.get().referral.required_trips;
        for i in 0..required {
            record_trip_and_maybe_reward(
                &store,
                &mut rng,
                &bus,
                &promo_config,
                &referee_id,
                UtcMillis::from_millis(i as i64),
            )
            .await
            .unwrap();
        }

        let wallet = store.get_wallet(&referrer_id).await.unwrap();
        assert_eq!(wallet.balance, promo_config.get().referral.reward_amount);

        // A further trip must not pay again.
        record_trip_and_maybe_reward(
            &store,
            &mut rng,
            &bus,
            &promo_config,
            &referee_id,
            UtcMillis::from_millis(999),
        )
        .await
        .unwrap();
        let wallet_again = store.get_wallet(&referrer_id).await.unwrap();
        assert_eq!(wallet_again.balance, wallet.balance);
    }
}
