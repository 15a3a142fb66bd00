//! The promo config store (§4.1): a single lock-free, swap-on-write
//! singleton so every engine reads the current referral/streak/gold-status
//! settings without contending on a mutex, and an admin update takes effect
//! for the very next read.

use std::sync::Arc;

use arc_swap::ArcSwap;
use common::ids::UserId;
use common::time::UtcMillis;

use crate::models::{GoldStatusConfig, PromoConfig, ReferralConfig, StreakConfig};

pub struct PromoConfigStore {
    current: ArcSwap<PromoConfig>,
}

impl PromoConfigStore {
    pub fn new(initial: PromoConfig) -> Self {
        Self {
            current: ArcSwap::from_pointee(initial),
        }
    }

    pub fn get(&self) -> Arc<PromoConfig> {
        self.current.load_full()
    }

    pub fn update_referral(
        &self,
        referral: ReferralConfig,
        now: UtcMillis,
        by: UserId,
    ) {
        self.swap(now, by, |cfg| cfg.referral = referral);
    }

    pub fn update_streak(&self, streak: StreakConfig, now: UtcMillis, by: UserId) {
        self.swap(now, by, |cfg| cfg.streak = streak);
    }

    pub fn update_gold_status(
        &self,
        gold_status: GoldStatusConfig,
        now: UtcMillis,
        by: UserId,
    ) {
        self.swap(now, by, |cfg| cfg.gold_status = gold_status);
    }

    /// Flips `enabled` on all three promo engines at once (§4.1
    /// `toggleAll`), e.g. for an incident response that needs every promo
    /// payout frozen immediately without editing each sub-config in turn.
    pub fn toggle_all(&self, enabled: bool, now: UtcMillis, by: UserId) {
        self.swap(now, by, |cfg| {
            cfg.referral.enabled = enabled;
            cfg.streak.enabled = enabled;
            cfg.gold_status.enabled = enabled;
        });
    }

    fn swap(&self, now: UtcMillis, by: UserId, edit: impl FnOnce(&mut PromoConfig)) {
        let mut next = (*self.current.load_full()).clone();
        edit(&mut next);
        next.updated_at = now;
        next.updated_by = Some(by);
        self.current.store(Arc::new(next));
    }
}

impl Default for PromoConfigStore {
    fn default() -> Self {
        Self::new(PromoConfig::default())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn update_takes_effect_on_next_read() {
        let store = PromoConfigStore::default();
        let mut streak = store.get().streak;
        streak.required_streak = 5;
        store.update_streak(
            streak,
            UtcMillis::from_millis(1),
            "admin".parse().unwrap(),
        );
        assert_eq!(store.get().streak.required_streak, 5);
    }
}
