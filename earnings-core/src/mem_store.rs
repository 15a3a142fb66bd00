//! The in-process [`Store`] implementation (§2a, A2; §5). Each entity lives
//! behind its own `tokio::sync::Mutex` row lock so unrelated riders never
//! contend with each other; an outer `RwLock<HashMap<..>>` per table only
//! ever guards map structure (insert/lookup), never a field mutation, so it
//! is held for a handful of instructions at a time.
//!
//! Lock order, always: wallet row, then referral row, then user row. No
//! engine operation in this crate ever needs more than one of each at a
//! time, so this order is never actually exercised concurrently in more
//! than one direction -- but it's documented here so a future addition
//! doesn't introduce a cycle.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use crate::error::CoreError;
use crate::models::{
    BlockedCredentials, Order, Referral, RiderPayout, User, Wallet,
};
use crate::store::Store;
use common::ids::{OrderId, PayoutId, ReferralId, UserId};
use common::time::UtcMillis;

type Row<V> = Arc<Mutex<V>>;
type Table<K, V> = RwLock<HashMap<K, Row<V>>>;

#[derive(Default)]
pub struct MemStore {
    users: Table<UserId, User>,
    user_insertion_order: RwLock<Vec<UserId>>,
    referral_codes: RwLock<HashMap<String, UserId>>,

    orders: Table<OrderId, Order>,

    referrals: Table<ReferralId, Referral>,
    referred_index: RwLock<HashMap<UserId, ReferralId>>,

    wallets: Table<UserId, Wallet>,

    payouts: Table<PayoutId, RiderPayout>,
    rider_payout_ids: RwLock<HashMap<UserId, Vec<PayoutId>>>,
    payment_reference_codes: RwLock<HashSet<String>>,

    blocked_credentials: RwLock<Vec<BlockedCredentials>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn row<K, V>(table: &Table<K, V>, key: &K) -> Option<Row<V>>
    where
        K: std::hash::Hash + Eq + Clone,
    {
        table.read().await.get(key).cloned()
    }

    async fn wallet_row(&self, user: &UserId) -> Row<Wallet> {
        if let Some(row) = Self::row(&self.wallets, user).await {
            return row;
        }
        let mut guard = self.wallets.write().await;
        guard
            .entry(user.clone())
            .or_insert_with(|| Arc::new(Mutex::new(Wallet::new(user.clone()))))
            .clone()
    }
}

#[async_trait]
impl Store for MemStore {
    async fn get_user(&self, id: &UserId) -> Result<User, CoreError> {
        let row = Self::row(&self.users, id)
            .await
            .ok_or_else(|| CoreError::UserNotFound { user: id.clone() })?;
        Ok(row.lock().await.clone())
    }

    async fn insert_user(&self, user: User) -> Result<(), CoreError> {
        let id = user.id.clone();
        let code = user.referral_code.clone();
        self.users
            .write()
            .await
            .insert(id.clone(), Arc::new(Mutex::new(user)));
        self.user_insertion_order.write().await.push(id.clone());
        if !code.is_empty() {
            self.referral_codes.write().await.insert(code, id);
        }
        Ok(())
    }

    async fn find_user_by_referral_code(
        &self,
        code: &str,
    ) -> Result<Option<User>, CoreError> {
        let id = self.referral_codes.read().await.get(code).cloned();
        match id {
            Some(id) => Ok(Some(self.get_user(&id).await?)),
            None => Ok(None),
        }
    }

    async fn get_order(&self, id: &OrderId) -> Result<Order, CoreError> {
        let row = Self::row(&self.orders, id)
            .await
            .ok_or_else(|| CoreError::OrderNotFound { order: id.clone() })?;
        Ok(row.lock().await.clone())
    }

    async fn insert_order(&self, order: Order) -> Result<(), CoreError> {
        self.orders
            .write()
            .await
            .insert(order.id.clone(), Arc::new(Mutex::new(order)));
        Ok(())
    }

    async fn get_referral(&self, id: &ReferralId) -> Result<Referral, CoreError> {
        let row = Self::row(&self.referrals, id).await.ok_or_else(|| {
            CoreError::Internal(anyhow::anyhow!("referral {id} not found"))
        })?;
        Ok(row.lock().await.clone())
    }

    async fn insert_referral(&self, referral: Referral) -> Result<(), CoreError> {
        let referred = referral.referred_user_id.clone();
        let id = referral.id.clone();
        self.referrals
            .write()
            .await
            .insert(id.clone(), Arc::new(Mutex::new(referral)));
        self.referred_index.write().await.insert(referred, id);
        Ok(())
    }

    async fn find_referral_by_referred(
        &self,
        referred: &UserId,
    ) -> Result<Option<Referral>, CoreError> {
        let id = self.referred_index.read().await.get(referred).cloned();
        match id {
            Some(id) => Ok(Some(self.get_referral(&id).await?)),
            None => Ok(None),
        }
    }

    async fn get_wallet(&self, user: &UserId) -> Result<Wallet, CoreError> {
        Ok(self.wallet_row(user).await.lock().await.clone())
    }

    async fn get_payout(&self, id: &PayoutId) -> Result<RiderPayout, CoreError> {
        let row = Self::row(&self.payouts, id)
            .await
            .ok_or_else(|| CoreError::PayoutNotFound { payout: id.clone() })?;
        Ok(row.lock().await.clone())
    }

    async fn insert_payout(&self, payout: RiderPayout) -> Result<(), CoreError> {
        let rider = payout.rider_id.clone();
        let id = payout.id.clone();
        self.payouts
            .write()
            .await
            .insert(id.clone(), Arc::new(Mutex::new(payout)));
        self.rider_payout_ids
            .write()
            .await
            .entry(rider)
            .or_default()
            .push(id);
        Ok(())
    }

    async fn find_open_payout(
        &self,
        rider: &UserId,
        week_start: UtcMillis,
    ) -> Result<Option<RiderPayout>, CoreError> {
        let ids = self
            .rider_payout_ids
            .read()
            .await
            .get(rider)
            .cloned()
            .unwrap_or_default();
        for id in ids {
            if let Some(row) = Self::row(&self.payouts, &id).await {
                let payout = row.lock().await;
                if payout.week_start.as_i64() == week_start.as_i64() {
                    return Ok(Some(payout.clone()));
                }
            }
        }
        Ok(None)
    }

    async fn list_payouts_for_rider(
        &self,
        rider: &UserId,
    ) -> Result<Vec<RiderPayout>, CoreError> {
        let ids = self
            .rider_payout_ids
            .read()
            .await
            .get(rider)
            .cloned()
            .unwrap_or_default();
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            out.push(self.get_payout(&id).await?);
        }
        Ok(out)
    }

    async fn list_delivered_orders_in_range(
        &self,
        start: UtcMillis,
        end: UtcMillis,
    ) -> Result<Vec<Order>, CoreError> {
        let rows: Vec<_> = self.orders.read().await.values().cloned().collect();
        let mut out = Vec::new();
        for row in rows {
            let order = row.lock().await;
            let Some(delivered_at) = order.delivered_at else {
                continue;
            };
            if order.status == crate::models::OrderStatus::Delivered
                && delivered_at.as_i64() >= start.as_i64()
                && delivered_at.as_i64() < end.as_i64()
            {
                out.push(order.clone());
            }
        }
        Ok(out)
    }

    async fn try_reserve_payment_reference_code(
        &self,
        code: &str,
    ) -> Result<bool, CoreError> {
        let mut codes = self.payment_reference_codes.write().await;
        if codes.contains(code) {
            return Ok(false);
        }
        codes.insert(code.to_string());
        Ok(true)
    }

    async fn list_rider_ids(
        &self,
        after: Option<&UserId>,
        limit: usize,
    ) -> Result<Vec<UserId>, CoreError> {
        let order = self.user_insertion_order.read().await;
        let start = match after {
            Some(after) => order.iter().position(|id| id == after).map(|i| i + 1).unwrap_or(0),
            None => 0,
        };
        let mut out = Vec::new();
        for id in order.iter().skip(start) {
            let Some(row) = Self::row(&self.users, id).await else {
                continue;
            };
            if row.lock().await.role == crate::models::Role::Rider {
                out.push(id.clone());
                if out.len() >= limit {
                    break;
                }
            }
        }
        Ok(out)
    }

    async fn is_credentials_blocked(
        &self,
        nin: Option<&str>,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<bool, CoreError> {
        let blocked = self.blocked_credentials.read().await;
        Ok(blocked.iter().any(|b| {
            (nin.is_some() && b.nin.as_deref() == nin)
                || (email.is_some() && b.email.as_deref() == email)
                || (phone.is_some() && b.phone_number.as_deref() == phone)
        }))
    }

    async fn insert_blocked_credentials(
        &self,
        blocked: BlockedCredentials,
    ) -> Result<(), CoreError> {
        self.blocked_credentials.write().await.push(blocked);
        Ok(())
    }

    async fn transact_wallet_and_user<F, R>(
        &self,
        user: &UserId,
        f: F,
    ) -> Result<R, CoreError>
    where
        F: FnOnce(&mut Wallet, &mut User) -> Result<R, CoreError> + Send,
        R: Send,
    {
        let wallet_row = self.wallet_row(user).await;
        let user_row = Self::row(&self.users, user)
            .await
            .ok_or_else(|| CoreError::UserNotFound { user: user.clone() })?;
        let mut wallet = wallet_row.lock().await;
        let mut user_guard = user_row.lock().await;
        f(&mut wallet, &mut user_guard)
    }

    async fn transact_user<F, R>(&self, user: &UserId, f: F) -> Result<R, CoreError>
    where
        F: FnOnce(&mut User) -> Result<R, CoreError> + Send,
        R: Send,
    {
        let row = Self::row(&self.users, user)
            .await
            .ok_or_else(|| CoreError::UserNotFound { user: user.clone() })?;
        let mut guard = row.lock().await;
        f(&mut guard)
    }

    async fn transact_order<F, R>(&self, order: &OrderId, f: F) -> Result<R, CoreError>
    where
        F: FnOnce(&mut Order) -> Result<R, CoreError> + Send,
        R: Send,
    {
        let row = Self::row(&self.orders, order)
            .await
            .ok_or_else(|| CoreError::OrderNotFound { order: order.clone() })?;
        let mut guard = row.lock().await;
        f(&mut guard)
    }

    async fn transact_referral<F, R>(
        &self,
        referral: &ReferralId,
        f: F,
    ) -> Result<R, CoreError>
    where
        F: FnOnce(&mut Referral) -> Result<R, CoreError> + Send,
        R: Send,
    {
        let row = Self::row(&self.referrals, referral)
            .await
            .ok_or_else(|| {
                CoreError::Internal(anyhow::anyhow!("referral {referral} not found"))
            })?;
        let mut guard = row.lock().await;
        f(&mut guard)
    }

    async fn transact_payout<F, R>(
        &self,
        payout: &PayoutId,
        f: F,
    ) -> Result<R, CoreError>
    where
        F: FnOnce(&mut RiderPayout) -> Result<R, CoreError> + Send,
        R: Send,
    {
        let row = Self::row(&self.payouts, payout)
            .await
            .ok_or_else(|| CoreError::PayoutNotFound {
                payout: payout.clone(),
            })?;
        let mut guard = row.lock().await;
        f(&mut guard)
    }
}
