use std::sync::Arc;

use earnings_core::event_bus::EventBus;
use earnings_core::mem_store::MemStore;
use earnings_core::promo_config::PromoConfigStore;
use earnings_core::settings::Settings;
use earnings_core::subscribers::AuditLogSubscriber;

use crate::blob_store::BlobStore;

/// Everything a handler needs, shared behind an `Arc` across the whole
/// router (§6a).
pub struct AppState {
    pub store: MemStore,
    pub promo_config: PromoConfigStore,
    pub bus: EventBus,
    pub settings: Settings,
    pub blob_store: Box<dyn BlobStore>,
}

impl AppState {
    pub fn new(settings: Settings, blob_store: Box<dyn BlobStore>) -> Self {
        let mut bus = EventBus::new();
        bus.register(Arc::new(AuditLogSubscriber));

        Self {
            store: MemStore::new(),
            promo_config: PromoConfigStore::default(),
            bus,
            settings,
            blob_store,
        }
    }
}
