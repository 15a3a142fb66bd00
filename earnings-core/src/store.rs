//! The storage port (§2a, A2). A single in-process implementation
//! ([`crate::mem_store::MemStore`]) backs it today; the trait exists so a
//! durable implementation can be swapped in later without touching any
//! engine.
//!
//! Every `transact_*` method is this crate's unit of atomicity: it acquires
//! the row lock(s) named in its doc comment, in the fixed order documented
//! on [`crate::mem_store::MemStore`], runs the caller's closure against a
//! `&mut` reference to the live row, and releases the lock(s) when the
//! closure returns. Closures should validate before mutating -- a closure
//! that mutates partway through and then returns `Err` leaves its partial
//! mutation applied, since there is no log to roll back against.

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::{
    BlockedCredentials, Order, Referral, RiderPayout, User, Wallet,
};
use common::ids::{OrderId, PayoutId, ReferralId, UserId};
use common::time::UtcMillis;

#[async_trait]
pub trait Store: Send + Sync + 'static {
    async fn get_user(&self, id: &UserId) -> Result<User, CoreError>;
    async fn insert_user(&self, user: User) -> Result<(), CoreError>;
    async fn find_user_by_referral_code(
        &self,
        code: &str,
    ) -> Result<Option<User>, CoreError>;

    async fn get_order(&self, id: &OrderId) -> Result<Order, CoreError>;
    async fn insert_order(&self, order: Order) -> Result<(), CoreError>;

    async fn get_referral(&self, id: &ReferralId) -> Result<Referral, CoreError>;
    async fn insert_referral(&self, referral: Referral) -> Result<(), CoreError>;
    async fn find_referral_by_referred(
        &self,
        referred: &UserId,
    ) -> Result<Option<Referral>, CoreError>;

    /// Returns the rider's wallet, creating an empty one on first access.
    async fn get_wallet(&self, user: &UserId) -> Result<Wallet, CoreError>;

    async fn get_payout(&self, id: &PayoutId) -> Result<RiderPayout, CoreError>;
    async fn insert_payout(&self, payout: RiderPayout) -> Result<(), CoreError>;
    async fn find_open_payout(
        &self,
        rider: &UserId,
        week_start: UtcMillis,
    ) -> Result<Option<RiderPayout>, CoreError>;
    async fn list_payouts_for_rider(
        &self,
        rider: &UserId,
    ) -> Result<Vec<RiderPayout>, CoreError>;

    /// Lists every delivered order whose `delivered_at` falls in
    /// `[start, end)`, for the weekly batch payout generator (§4.7).
    async fn list_delivered_orders_in_range(
        &self,
        start: UtcMillis,
        end: UtcMillis,
    ) -> Result<Vec<Order>, CoreError>;

    /// Atomically claims `code` as a payment reference code. Returns `false`
    /// without claiming it if another payout already holds it, so the
    /// caller can regenerate and retry (§4.7).
    async fn try_reserve_payment_reference_code(
        &self,
        code: &str,
    ) -> Result<bool, CoreError>;

    /// Lists up to `limit` rider ids strictly after `after` in iteration
    /// order, for the payment-window sweep's cursor pagination (§4.8).
    async fn list_rider_ids(
        &self,
        after: Option<&UserId>,
        limit: usize,
    ) -> Result<Vec<UserId>, CoreError>;

    async fn is_credentials_blocked(
        &self,
        nin: Option<&str>,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<bool, CoreError>;
    async fn insert_blocked_credentials(
        &self,
        blocked: BlockedCredentials,
    ) -> Result<(), CoreError>;

    /// Locks `user`'s wallet row then their user row, in that order, and
    /// applies `f` to both.
    async fn transact_wallet_and_user<F, R>(
        &self,
        user: &UserId,
        f: F,
    ) -> Result<R, CoreError>
    where
        F: FnOnce(&mut Wallet, &mut User) -> Result<R, CoreError> + Send,
        R: Send;

    /// Locks a single user row and applies `f`.
    async fn transact_user<F, R>(&self, user: &UserId, f: F) -> Result<R, CoreError>
    where
        F: FnOnce(&mut User) -> Result<R, CoreError> + Send,
        R: Send;

    /// Locks a single order row and applies `f`.
    async fn transact_order<F, R>(&self, order: &OrderId, f: F) -> Result<R, CoreError>
    where
        F: FnOnce(&mut Order) -> Result<R, CoreError> + Send,
        R: Send;

    /// Locks a single referral row and applies `f`.
    async fn transact_referral<F, R>(
        &self,
        referral: &ReferralId,
        f: F,
    ) -> Result<R, CoreError>
    where
        F: FnOnce(&mut Referral) -> Result<R, CoreError> + Send,
        R: Send;

    /// Locks a single payout row and applies `f`.
    async fn transact_payout<F, R>(
        &self,
        payout: &PayoutId,
        f: F,
    ) -> Result<R, CoreError>
    where
        F: FnOnce(&mut RiderPayout) -> Result<R, CoreError> + Send,
        R: Send;
}
