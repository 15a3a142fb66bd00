//! The wallet ledger (§4.2): every balance change is an appended
//! [`Transaction`], and the balance is always the sum of `Completed`
//! transaction amounts (§8 invariant 2). Credits and debits go through
//! [`Store::transact_wallet_and_user`] so a rider's balance and profile
//! counters never drift apart.

use rust_decimal::Decimal;

use common::ids::{OrderId, ReferralId, TransactionId, UserId};
use common::money::Money;
use common::rng::Crng;
use common::time::UtcMillis;

use crate::error::CoreError;
use crate::models::{Transaction, TransactionStatus, TransactionType, Wallet};
use crate::store::Store;

/// Credits `amount` to `user`'s wallet, recording a transaction of `kind`.
/// Returns the new balance.
#[allow(clippy::too_many_arguments)]
pub async fn credit(
    store: &impl Store,
    rng: &mut impl Crng,
    user: &UserId,
    kind: TransactionType,
    amount: Money,
    order: Option<OrderId>,
    referral: Option<ReferralId>,
    metadata: serde_json::Value,
    now: UtcMillis,
) -> Result<Money, CoreError> {
    let txn_id = TransactionId::generate(rng);
    store
        .transact_wallet_and_user(user, move |wallet, _user| {
            apply(wallet, txn_id, user.clone(), kind, amount.as_decimal(), order, referral, metadata, now)
        })
        .await
}

/// Debits `amount` from `user`'s wallet if the balance covers it, else
/// returns [`CoreError::InsufficientFunds`].
pub async fn debit(
    store: &impl Store,
    rng: &mut impl Crng,
    user: &UserId,
    kind: TransactionType,
    amount: Money,
    order: Option<OrderId>,
    metadata: serde_json::Value,
    now: UtcMillis,
) -> Result<Money, CoreError> {
    let txn_id = TransactionId::generate(rng);
    store
        .transact_wallet_and_user(user, move |wallet, _user| {
            if wallet.balance.checked_sub(amount).is_none() {
                return Err(CoreError::InsufficientFunds {
                    user: user.clone(),
                    balance: wallet.balance,
                    requested: amount,
                });
            }
            apply(
                wallet,
                txn_id,
                user.clone(),
                kind,
                -amount.as_decimal(),
                order,
                None,
                metadata,
                now,
            )
        })
        .await
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn apply(
    wallet: &mut Wallet,
    txn_id: TransactionId,
    user: UserId,
    kind: TransactionType,
    signed_amount: Decimal,
    order: Option<OrderId>,
    referral: Option<ReferralId>,
    metadata: serde_json::Value,
    now: UtcMillis,
) -> Result<Money, CoreError> {
    let new_balance_decimal = wallet.balance.as_decimal() + signed_amount;
    let new_balance = Money::try_from_decimal(new_balance_decimal).map_err(|_| {
        CoreError::InsufficientFunds {
            user: user.clone(),
            balance: wallet.balance,
            requested: Money::try_from_decimal(-signed_amount).unwrap_or(Money::ZERO),
        }
    })?;
    wallet.transactions.push(Transaction {
        id: txn_id,
        user_id: user,
        kind,
        amount: signed_amount,
        status: TransactionStatus::Completed,
        order_id: order,
        referral_id: referral,
        metadata,
        processed_at: now,
    });
    wallet.balance = new_balance;
    Ok(new_balance)
}

/// Recomputes a wallet's balance from scratch over its transaction history,
/// for the §8 invariant-2 property tests and for reconciliation tooling.
pub fn recomputed_balance(wallet: &Wallet) -> Option<Money> {
    let mut total = Decimal::ZERO;
    for txn in &wallet.transactions {
        if txn.status == TransactionStatus::Completed {
            total += txn.amount;
        }
    }
    Money::try_from_decimal(total).ok()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mem_store::MemStore;
    use crate::models::Role;
    use common::rng::SysRng;

    async fn setup() -> (MemStore, UserId) {
        let store = MemStore::new();
        let mut rng = SysRng::new();
        let id = UserId::generate(&mut rng);
        store
            .insert_user(crate::models::User::new(id.clone(), Role::Rider, "R1".into()))
            .await
            .unwrap();
        (store, id)
    }

    #[tokio::test]
    async fn credit_then_debit_round_trips_balance() {
        let (store, user) = setup().await;
        let mut rng = SysRng::new();
        let now = UtcMillis::from_millis(1);
        credit(
            &store,
            &mut rng,
            &user,
            TransactionType::StreakBonus,
            Money::from_minor_units(50_000),
            None,
            None,
            serde_json::Value::Null,
            now,
        )
        .await
        .unwrap();
        let balance = debit(
            &store,
            &mut rng,
            &user,
            TransactionType::Adjustment,
            Money::from_minor_units(20_000),
            None,
            serde_json::Value::Null,
            now,
        )
        .await
        .unwrap();
        assert_eq!(balance, Money::from_minor_units(30_000));
        let wallet = store.get_wallet(&user).await.unwrap();
        assert_eq!(recomputed_balance(&wallet), Some(balance));
    }

    #[tokio::test]
    async fn debit_beyond_balance_is_rejected() {
        let (store, user) = setup().await;
        let mut rng = SysRng::new();
        let now = UtcMillis::from_millis(1);
        let err = debit(
            &store,
            &mut rng,
            &user,
            TransactionType::Adjustment,
            Money::from_minor_units(100),
            None,
            serde_json::Value::Null,
            now,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CoreError::InsufficientFunds { .. }));
    }
}
