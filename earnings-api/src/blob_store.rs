//! The payment-proof blob store seam (§6a). Storing uploaded images
//! durably is the out-of-scope `BlobStore` collaborator's job; this crate
//! only validates the upload at the HTTP boundary and hands it off through
//! this trait. [`InMemoryBlobStore`] is a placeholder that never persists
//! anything, for local development and tests.

use async_trait::async_trait;
use bytes::Bytes;
use common::rng::{random_hex_id, SysRng};
use tokio::sync::Mutex;

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores `bytes` (already validated as an image under the size cap)
    /// and returns a URL the payout document can carry.
    async fn store(&self, bytes: Bytes, content_type: &str) -> anyhow::Result<String>;
}

/// Keeps uploads in memory only, returning synthetic `lexe://local/<id>`
/// URLs. Never evicts, so this is for local/dev use only -- a production
/// deployment swaps in a real object-store-backed [`BlobStore`].
#[derive(Default)]
pub struct InMemoryBlobStore {
    rng: Mutex<SysRng>,
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn store(&self, bytes: Bytes, content_type: &str) -> anyhow::Result<String> {
        let id = {
            let mut rng = self.rng.lock().await;
            random_hex_id(&mut *rng, 16)
        };
        tracing::debug!(content_type, len = bytes.len(), "stored payment proof blob (in-memory stub)");
        Ok(format!("lexe://local/{id}"))
    }
}
