//! The in-process event bus (§4.10). Deliberately not the teacher's
//! broadcast-channel `EventsBus<T>` (built for ad-hoc one-shot waiters):
//! this bus needs ordered delivery to a fixed, registered set of subscribers
//! with one subscriber's failure never blocking the next, so it's a plain
//! `Vec<Arc<dyn Subscriber>>` walked in registration order instead.

use std::sync::Arc;

use async_trait::async_trait;
use common::ids::{OrderId, PayoutId, ReferralId, UserId};
use common::money::Money;
use common::time::UtcMillis;

#[derive(Clone, Debug)]
pub enum DomainEvent {
    OrderDelivered {
        order: OrderId,
        rider: UserId,
        gross: Money,
        commission: Money,
        rider_net: Money,
        at: UtcMillis,
    },
    ReferralRewarded {
        referral: ReferralId,
        referrer: UserId,
        referred: UserId,
        amount: Money,
    },
    StreakBonusAwarded {
        rider: UserId,
        streak: u32,
        amount: Money,
    },
    GoldStatusUnlocked {
        rider: UserId,
        expires_at: UtcMillis,
    },
    GoldStatusExpired {
        rider: UserId,
    },
    PayoutGenerated {
        payout: PayoutId,
        rider: UserId,
        rider_net_total: Money,
    },
    PayoutMarkedPaid {
        payout: PayoutId,
        rider: UserId,
    },
    RiderPaymentBlocked {
        rider: UserId,
        reason: String,
    },
    RiderStruck {
        rider: UserId,
        strike_count: usize,
    },
    RiderDeactivated {
        rider: UserId,
        reason: String,
    },
}

/// A handler registered with the [`EventBus`]. Implementations should be
/// cheap and should not themselves fail the operation that raised the
/// event -- log and return on error.
#[async_trait]
pub trait Subscriber: Send + Sync {
    async fn handle(&self, event: &DomainEvent);
}

/// Dispatches events to every registered subscriber, in registration order.
/// A no-op when no subscribers are registered, so engines can publish
/// unconditionally without checking whether anyone's listening.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Vec<Arc<dyn Subscriber>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, subscriber: Arc<dyn Subscriber>) {
        self.subscribers.push(subscriber);
    }

    pub async fn publish(&self, event: DomainEvent) {
        for subscriber in &self.subscribers {
            subscriber.handle(&event).await;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSubscriber(Arc<AtomicUsize>);

    #[async_trait]
    impl Subscriber for CountingSubscriber {
        async fn handle(&self, _event: &DomainEvent) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn publish_reaches_every_subscriber() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut bus = EventBus::new();
        bus.register(Arc::new(CountingSubscriber(count.clone())));
        bus.register(Arc::new(CountingSubscriber(count.clone())));

        bus.publish(DomainEvent::RiderStruck {
            rider: "r1".parse().unwrap(),
            strike_count: 1,
        })
        .await;

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn publish_with_no_subscribers_is_a_noop() {
        let bus = EventBus::new();
        bus.publish(DomainEvent::RiderDeactivated {
            rider: "r1".parse().unwrap(),
            reason: "test".to_string(),
        })
        .await;
    }
}
