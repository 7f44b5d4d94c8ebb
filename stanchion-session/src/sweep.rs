//! Soft-delete sweep of expired sessions.

use crate::error::SessionResult;
use crate::record::{FIELD_ACTIVE, FIELD_EXPIRY};
use chrono::Utc;
use stanchion_document::{DocumentStore, FieldSet, Filter};
use std::sync::Arc;
use tracing::{debug, warn};

/// Marks expired-but-still-active records inactive.
///
/// One atomic multi-document update per sweep, so the cost is a single
/// round trip no matter how many records expired. The sweep never removes
/// documents; physical cleanup belongs to an out-of-band job. A swept
/// record's `lock` field keeps working, so lock re-acquisition on an
/// expired id is unaffected.
pub struct ExpirationSweeper<S> {
    store: Arc<S>,
}

impl<S: DocumentStore> ExpirationSweeper<S> {
    /// Create a sweeper over a store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Flip `active` to 0 on every record with `expiry < now`.
    ///
    /// Zero matches is success; running twice in a row is a no-op the
    /// second time. Returns `Ok(false)` only when the store does not
    /// acknowledge the update.
    pub async fn sweep_expired(&self) -> SessionResult<bool> {
        let now = Utc::now().timestamp();
        let report = self
            .store
            .update_many(
                &Filter::new().lt(FIELD_EXPIRY, now),
                &FieldSet::new().set(FIELD_ACTIVE, 0),
            )
            .await?;

        if !report.acknowledged {
            warn!("expiration sweep not acknowledged");
            return Ok(false);
        }
        debug!(matched = report.matched, swept = report.modified, "expiration sweep complete");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FIELD_SID;
    use serde_json::json;
    use stanchion_document::MemoryDocumentStore;

    async fn seeded_store() -> Arc<MemoryDocumentStore> {
        let store = Arc::new(MemoryDocumentStore::new());
        let past = Utc::now().timestamp() - 10;
        let future = Utc::now().timestamp() + 3600;
        for (sid, expiry) in [("old", past), ("older", past - 100), ("live", future)] {
            store
                .insert_one(
                    json!({"sid": sid, "active": 1, "expiry": expiry, "lock": 0})
                        .as_object()
                        .cloned()
                        .unwrap(),
                )
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_sweep_marks_only_expired_inactive() {
        let store = seeded_store().await;
        assert!(ExpirationSweeper::new(store.clone()).sweep_expired().await.unwrap());

        for sid in ["old", "older"] {
            let document = store
                .find_one(&Filter::new().eq(FIELD_SID, sid))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(document[FIELD_ACTIVE], json!(0), "{sid} should be swept");
        }

        let live = store
            .find_one(&Filter::new().eq(FIELD_SID, "live"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(live[FIELD_ACTIVE], json!(1));
    }

    #[tokio::test]
    async fn test_sweep_never_deletes() {
        let store = seeded_store().await;
        let sweeper = ExpirationSweeper::new(store.clone());
        sweeper.sweep_expired().await.unwrap();
        assert_eq!(store.count(&Filter::new()).await, 3);
    }

    #[tokio::test]
    async fn test_sweep_is_idempotent() {
        let store = seeded_store().await;
        let sweeper = ExpirationSweeper::new(store.clone());
        sweeper.sweep_expired().await.unwrap();
        let inactive_after_first = store.count(&Filter::new().eq(FIELD_ACTIVE, 0)).await;

        sweeper.sweep_expired().await.unwrap();
        let inactive_after_second = store.count(&Filter::new().eq(FIELD_ACTIVE, 0)).await;
        assert_eq!(inactive_after_first, inactive_after_second);
    }

    #[tokio::test]
    async fn test_sweep_of_empty_store_succeeds() {
        let store = Arc::new(MemoryDocumentStore::new());
        assert!(ExpirationSweeper::new(store).sweep_expired().await.unwrap());
    }
}
