//! The entity types of §3: users, orders, referrals, wallets, payouts, the
//! promo config singleton, and blocked credentials.

use common::ids::{OrderId, PayoutId, ReferralId, TransactionId, UserId};
use common::money::Money;
use common::time::UtcMillis;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Role {
    Customer,
    Rider,
    Admin,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ServiceType {
    Courier,
    Ride,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Assigned,
    PickedUp,
    Delivering,
    Delivered,
    Cancelled,
}

/// A strike accumulated for remaining overdue past the grace period.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct StrikeEvent {
    pub at: UtcMillis,
    pub reason: String,
    pub payout_id: PayoutId,
}

/// The rider's current Gold Status grant, if any. `isActive` is computed
/// lazily from `expires_at` rather than stored as a boolean (§4.6): a status
/// that has lapsed is simply a record whose `expires_at` is in the past.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct GoldStatus {
    pub unlocked_at: Option<UtcMillis>,
    pub expires_at: Option<UtcMillis>,
    pub discount_percent: Decimal,
    pub total_unlocks: u32,
    /// Whether the one-shot "your Gold Status expired" notification has
    /// already been emitted for the current `expires_at`.
    pub expiry_notified: bool,
}

impl GoldStatus {
    pub fn is_active(&self, now: UtcMillis) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at.as_i64() > now.as_i64(),
            None => false,
        }
    }
}

/// A platform user: customer, rider, or admin. Rider-only fields are simply
/// left at their defaults for customers and admins rather than split into a
/// separate type, mirroring how the source models a single `users` table.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub role: Role,
    pub email: String,
    pub phone_number: String,
    pub nin: String,

    // --- rider enforcement state --- //
    pub payment_blocked: bool,
    pub payment_blocked_at: Option<UtcMillis>,
    pub payment_blocked_reason: Option<String>,
    pub strikes: Vec<StrikeEvent>,
    pub account_deactivated: bool,
    pub account_deactivated_at: Option<UtcMillis>,
    pub account_deactivated_reason: Option<String>,

    // --- referral --- //
    pub referral_code: String,
    pub referred_by: Option<UserId>,
    pub referral_reward_earned: Money,

    // --- trip/streak counters --- //
    pub completed_trips: u64,
    pub current_streak: u32,
    pub last_streak_bonus_at: Option<UtcMillis>,
    pub total_streak_bonuses: u32,
    /// Timestamps of deliveries completed inside the current Gold Status
    /// lookback window, pruned to `window_days` on every append (§4.6).
    /// Bounded in practice because the window only ever holds a handful of
    /// days' worth of deliveries.
    pub recent_deliveries: Vec<UtcMillis>,
    /// Order ids this rider has already received a streak bonus for (§4.5),
    /// so a retried or replayed delivery event can never double-pay one.
    pub streak_bonus_order_ids: std::collections::HashSet<OrderId>,

    // --- gold status --- //
    pub gold_status: GoldStatus,
}

impl User {
    pub fn new(id: UserId, role: Role, referral_code: String) -> Self {
        Self {
            id,
            role,
            email: String::new(),
            phone_number: String::new(),
            nin: String::new(),
            payment_blocked: false,
            payment_blocked_at: None,
            payment_blocked_reason: None,
            strikes: Vec::new(),
            account_deactivated: false,
            account_deactivated_at: None,
            account_deactivated_reason: None,
            referral_code,
            referred_by: None,
            referral_reward_earned: Money::ZERO,
            completed_trips: 0,
            current_streak: 0,
            last_streak_bonus_at: None,
            total_streak_bonuses: 0,
            recent_deliveries: Vec::new(),
            streak_bonus_order_ids: std::collections::HashSet::new(),
            gold_status: GoldStatus::default(),
        }
    }
}

/// The frozen commission split for a delivered order (§4.3). Once written,
/// `gross_amount == commission_amount + rider_net_amount` always holds.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Financial {
    pub gross_amount: Money,
    pub commission_rate_pct: Decimal,
    pub commission_amount: Money,
    pub rider_net_amount: Money,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: UserId,
    pub rider_id: Option<UserId>,
    pub service_type: ServiceType,
    pub price: Money,
    pub status: OrderStatus,
    pub delivered_at: Option<UtcMillis>,
    pub financial: Option<Financial>,
}

impl Order {
    pub fn new(
        id: OrderId,
        customer_id: UserId,
        service_type: ServiceType,
        price: Money,
    ) -> Self {
        Self {
            id,
            customer_id,
            rider_id: None,
            service_type,
            price,
            status: OrderStatus::Pending,
            delivered_at: None,
            financial: None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Referral {
    pub id: ReferralId,
    pub referrer_id: UserId,
    pub referred_user_id: UserId,
    pub referral_code: String,
    pub completed_trips: u64,
    pub reward_amount: Money,
    pub reward_paid: bool,
    pub paid_at: Option<UtcMillis>,
    pub transaction_id: Option<TransactionId>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum TransactionType {
    ReferralReward,
    StreakBonus,
    /// A commission amount charged against a rider's wallet, outside the
    /// normal per-delivery split (riders collect gross from customers
    /// directly and remit commission separately; this is that remittance).
    CommissionDebit,
    /// A manual admin correction, positive or negative.
    Adjustment,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum TransactionStatus {
    Completed,
}

/// An append-only wallet ledger entry. `amount` is signed: positive for
/// credits, negative for debits. The wallet balance is always the running
/// sum of `amount` over every `Completed` transaction (§8 invariant 2).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub user_id: UserId,
    pub kind: TransactionType,
    pub amount: Decimal,
    pub status: TransactionStatus,
    pub order_id: Option<OrderId>,
    pub referral_id: Option<ReferralId>,
    pub metadata: serde_json::Value,
    pub processed_at: UtcMillis,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Wallet {
    pub user_id: UserId,
    pub balance: Money,
    pub transactions: Vec<Transaction>,
}

impl Wallet {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            balance: Money::ZERO,
            transactions: Vec::new(),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum PayoutStatus {
    Pending,
    Paid,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum MarkedPaidBy {
    Rider,
    Admin,
    Psp,
}

/// The raw payment gateway's view of this payout, if one was ever opened. The
/// real integration lives in the out-of-scope `PSP` collaborator; we carry
/// only the fields the payout document needs to display/reconcile.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaystackPayment {
    pub reference: String,
    pub status: String,
    pub paid_at: Option<UtcMillis>,
}

/// An immutable snapshot of a delivered order as embedded in a payout, taken
/// at append time so later edits to the `Order` (there shouldn't be any,
/// post-delivery) can never retroactively change a payout's totals.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PayoutOrderSnapshot {
    pub order_id: OrderId,
    pub delivered_at: UtcMillis,
    pub gross: Money,
    pub commission: Money,
    pub rider_net: Money,
    pub service_type: ServiceType,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct PayoutTotals {
    pub gross: Money,
    pub commission: Money,
    pub rider_net: Money,
    pub count: u64,
}

impl PayoutTotals {
    /// Recomputes totals from scratch over `orders`, never by incremental
    /// addition, per §4.7 step 5 ("recompute from scratch ... never by
    /// in-place addition") and §8 invariant 1.
    pub fn recompute(orders: &[PayoutOrderSnapshot]) -> Self {
        let mut totals = PayoutTotals::default();
        for o in orders {
            totals.gross = totals.gross.checked_add(o.gross).expect("payout totals overflowed");
            totals.commission = totals
                .commission
                .checked_add(o.commission)
                .expect("payout totals overflowed");
            totals.rider_net = totals
                .rider_net
                .checked_add(o.rider_net)
                .expect("payout totals overflowed");
            totals.count += 1;
        }
        totals
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RiderPayout {
    pub id: PayoutId,
    pub rider_id: UserId,
    pub week_start: UtcMillis,
    pub week_end: UtcMillis,
    pub orders: Vec<PayoutOrderSnapshot>,
    pub totals: PayoutTotals,
    pub status: PayoutStatus,
    pub paid_at: Option<UtcMillis>,
    pub marked_paid_by: Option<MarkedPaidBy>,
    pub payment_proof_url: Option<String>,
    pub payment_reference_code: String,
    pub paystack_payment: Option<PaystackPayment>,
    pub rewards_used: Money,
}

impl RiderPayout {
    pub fn contains_order(&self, order_id: &OrderId) -> bool {
        self.orders.iter().any(|o| &o.order_id == order_id)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ReferralConfig {
    pub enabled: bool,
    pub reward_amount: Money,
    pub required_trips: u32,
}

impl ReferralConfig {
    /// Rejects an update whose fields fall outside §4.1's configured
    /// ranges, before it ever reaches the promo config singleton.
    pub fn validate(&self) -> Result<(), CoreError> {
        in_range_money("referral.reward_amount", self.reward_amount, 0, 100_000)?;
        in_range_u32("referral.required_trips", self.required_trips, 1, 100)?;
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct StreakConfig {
    pub enabled: bool,
    pub bonus_amount: Money,
    pub required_streak: u32,
}

impl StreakConfig {
    pub fn validate(&self) -> Result<(), CoreError> {
        in_range_money("streak.bonus_amount", self.bonus_amount, 0, 100_000)?;
        in_range_u32("streak.required_streak", self.required_streak, 1, 100)?;
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct GoldStatusConfig {
    pub enabled: bool,
    pub required_rides: u32,
    pub window_days: u32,
    pub duration_days: u32,
    pub discount_percent: Decimal,
}

impl GoldStatusConfig {
    pub fn validate(&self) -> Result<(), CoreError> {
        in_range_u32("gold_status.required_rides", self.required_rides, 1, 100)?;
        in_range_u32("gold_status.window_days", self.window_days, 1, 365)?;
        in_range_u32("gold_status.duration_days", self.duration_days, 1, 365)?;
        if self.discount_percent < Decimal::ZERO || self.discount_percent > Decimal::from(100) {
            return Err(CoreError::InvalidConfig {
                field: "gold_status.discount_percent".to_string(),
                reason: format!("{} is outside [0, 100]", self.discount_percent),
            });
        }
        Ok(())
    }
}

fn in_range_u32(field: &str, value: u32, min: u32, max: u32) -> Result<(), CoreError> {
    if value < min || value > max {
        return Err(CoreError::InvalidConfig {
            field: field.to_string(),
            reason: format!("{value} is outside [{min}, {max}]"),
        });
    }
    Ok(())
}

fn in_range_money(field: &str, value: Money, min_units: i64, max_units: i64) -> Result<(), CoreError> {
    let min = Money::from_minor_units(min_units * 100);
    let max = Money::from_minor_units(max_units * 100);
    if value < min || value > max {
        return Err(CoreError::InvalidConfig {
            field: field.to_string(),
            reason: format!("{} is outside [{min}, {max}]", value.as_decimal()),
        });
    }
    Ok(())
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PromoConfig {
    pub referral: ReferralConfig,
    pub streak: StreakConfig,
    pub gold_status: GoldStatusConfig,
    pub updated_at: UtcMillis,
    pub updated_by: Option<UserId>,
}

impl Default for PromoConfig {
    fn default() -> Self {
        Self {
            referral: ReferralConfig {
                enabled: true,
                reward_amount: Money::from_minor_units(100_000), // 1000.00
                required_trips: 2,
            },
            streak: StreakConfig {
                enabled: true,
                bonus_amount: Money::from_minor_units(50_000), // 500.00
                required_streak: 3,
            },
            gold_status: GoldStatusConfig {
                enabled: true,
                required_rides: 7,
                window_days: 10,
                duration_days: 30,
                discount_percent: Decimal::from(5),
            },
            updated_at: UtcMillis::from_millis(0),
            updated_by: None,
        }
    }
}

/// An immutable record preventing re-registration with a deactivated
/// rider's identifiers (§4.9 `deactivate`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlockedCredentials {
    pub rider_id: UserId,
    pub nin: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub created_at: UtcMillis,
}
