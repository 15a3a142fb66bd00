//! Real [`Subscriber`] implementations (§4.10). The engines that must
//! commit a side effect transactionally with the event that causes it
//! (crediting a wallet, advancing a streak) call each other directly and
//! synchronously -- an event bus is the wrong tool for effects that have to
//! land atomically with their trigger. What the bus is for is secondary
//! observers that can tolerate running after the triggering transaction has
//! already committed: audit trails, metrics, notifications. This module is
//! that seam's first real tenant.

use async_trait::async_trait;
use tracing::info;

use crate::event_bus::{DomainEvent, Subscriber};

/// Logs every domain event at `info`, structured so a log aggregator can
/// index on `event` and the entity ids. Registered unconditionally in
/// [`crate::event_bus::EventBus::new`]'s caller so every deployment gets an
/// audit trail of earnings-affecting events without wiring anything extra.
pub struct AuditLogSubscriber;

#[async_trait]
impl Subscriber for AuditLogSubscriber {
    async fn handle(&self, event: &DomainEvent) {
        match event {
            DomainEvent::OrderDelivered { order, rider, gross, commission, rider_net, at } => {
                info!(event = "order.delivered", %order, %rider, %gross, %commission, %rider_net, at = at.as_i64());
            }
            DomainEvent::ReferralRewarded { referral, referrer, referred, amount } => {
                info!(event = "referral.rewarded", %referral, %referrer, %referred, %amount);
            }
            DomainEvent::StreakBonusAwarded { rider, streak, amount } => {
                info!(event = "streak.bonus_awarded", %rider, streak, %amount);
            }
            DomainEvent::GoldStatusUnlocked { rider, expires_at } => {
                info!(event = "gold_status.unlocked", %rider, expires_at = expires_at.as_i64());
            }
            DomainEvent::GoldStatusExpired { rider } => {
                info!(event = "gold_status.expired", %rider);
            }
            DomainEvent::PayoutGenerated { payout, rider, rider_net_total } => {
                info!(event = "payout.generated", %payout, %rider, %rider_net_total);
            }
            DomainEvent::PayoutMarkedPaid { payout, rider } => {
                info!(event = "payout.marked_paid", %payout, %rider);
            }
            DomainEvent::RiderPaymentBlocked { rider, reason } => {
                info!(event = "rider.payment_blocked", %rider, %reason);
            }
            DomainEvent::RiderStruck { rider, strike_count } => {
                info!(event = "rider.struck", %rider, strike_count);
            }
            DomainEvent::RiderDeactivated { rider, reason } => {
                info!(event = "rider.deactivated", %rider, %reason);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::event_bus::EventBus;
    use std::sync::Arc;

    #[tokio::test]
    async fn audit_log_subscriber_handles_every_variant_without_panicking() {
        let mut bus = EventBus::new();
        bus.register(Arc::new(AuditLogSubscriber));
        bus.publish(DomainEvent::RiderStruck {
            rider: "r1".parse().unwrap(),
            strike_count: 1,
        })
        .await;
    }
}
