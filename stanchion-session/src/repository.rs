//! Session persistence: fetch, merge-and-store, discard.

use crate::config::SessionConfig;
use crate::error::SessionResult;
use crate::record::{FIELD_ACTIVE, FIELD_EXPIRY, FIELD_SID, SessionRecord};
use chrono::Utc;
use stanchion_document::{DocumentStore, FieldSet, Filter};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Read/write/destroy for session records.
///
/// The repository does not enforce lock possession; serializing writers is
/// a cooperative convention between [`LockManager`](crate::LockManager) and
/// the facade's read-then-write flow.
pub struct SessionRepository<S> {
    store: Arc<S>,
    lifetime: Duration,
}

impl<S: DocumentStore> SessionRepository<S> {
    /// Create a repository using the config's session lifetime.
    pub fn new(store: Arc<S>, config: &SessionConfig) -> Self {
        Self {
            store,
            lifetime: config.lifetime,
        }
    }

    /// Fetch the live record for an id.
    ///
    /// Only a record with `active == 1` and `expiry >= now` is visible.
    /// Absence (never created, expired, or soft-deleted) is `Ok(None)`,
    /// not an error. The returned record is the merge base for a later
    /// [`store`](Self::store) in the same request.
    pub async fn fetch(&self, sid: &str) -> SessionResult<Option<SessionRecord>> {
        let now = Utc::now().timestamp();
        let filter = Filter::new()
            .eq(FIELD_SID, sid)
            .eq(FIELD_ACTIVE, 1)
            .gte(FIELD_EXPIRY, now);

        match self.store.find_one(&filter).await? {
            Some(document) => Ok(Some(SessionRecord::from_document(document)?)),
            None => Ok(None),
        }
    }

    /// Persist a payload for an id, releasing any held lock.
    ///
    /// The written fields are merged over `prior` (a record retained from
    /// `fetch`) so unrelated fields survive; with no prior record a fresh
    /// one is constructed. `lock` is reset to 0 and `expiry` refreshed to
    /// `now + lifetime` unconditionally: a write always releases the lock
    /// it (or a stale holder) was holding.
    ///
    /// Returns `Ok(false)` when the store does not acknowledge the write;
    /// the session simply does not persist this request.
    pub async fn store(
        &self,
        sid: &str,
        payload: &[u8],
        prior: Option<&SessionRecord>,
    ) -> SessionResult<bool> {
        let expiry = Utc::now().timestamp() + self.lifetime.as_secs() as i64;

        let mut record = match prior {
            Some(prior) => prior.clone(),
            None => SessionRecord::new(sid),
        };
        record.data = payload.to_vec();
        record.lock = 0;
        record.active = 1;
        record.expiry = expiry;

        let update = FieldSet::from(record.into_document());
        let report = self
            .store
            .update_one(&Filter::new().eq(FIELD_SID, sid), &update, true)
            .await?;

        if !report.acknowledged {
            warn!(sid, "session write not acknowledged");
            return Ok(false);
        }
        debug!(sid, upserted = report.upserted, "session written");
        Ok(true)
    }

    /// Remove the record for an id. Removing a non-existent id succeeds.
    ///
    /// Returns `Ok(false)` only when the store does not acknowledge the
    /// delete.
    pub async fn discard(&self, sid: &str) -> SessionResult<bool> {
        let report = self
            .store
            .delete_one(&Filter::new().eq(FIELD_SID, sid))
            .await?;

        if !report.acknowledged {
            warn!(sid, "session removal not acknowledged");
            return Ok(false);
        }
        debug!(sid, deleted = report.deleted, "session discarded");
        Ok(true)
    }
}
