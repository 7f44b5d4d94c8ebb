//! Per-session advisory locks built from document store primitives.

use crate::config::SessionConfig;
use crate::error::{SessionError, SessionResult};
use crate::record::{FIELD_LOCK, FIELD_SID, INDEX_SID};
use serde_json::Value;
use stanchion_document::{Document, DocumentError, DocumentStore, FieldSet, Filter};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Advisory mutual exclusion for one session id at a time.
///
/// No lock server is involved: exclusivity rides on the store's atomic
/// conditional update (flipping `lock` from 0 to 1 on the exact document the
/// free-lock filter matched) and on the unique session-id index turning a
/// racing insert into a duplicate-key signal. A lost race is contention, not
/// a fault; the caller backs off and retries until the wait budget runs out.
///
/// The lock is not reentrant and waiters are not ordered: whoever wins the
/// next atomic update gets it.
pub struct LockManager<S> {
    store: Arc<S>,
    wait_budget: Duration,
    initial_delay: Duration,
    max_delay: Duration,
}

impl<S: DocumentStore> LockManager<S> {
    /// Create a lock manager over a store using the config's budget and
    /// backoff bounds.
    pub fn new(store: Arc<S>, config: &SessionConfig) -> Self {
        Self {
            store,
            wait_budget: config.lock_wait,
            initial_delay: config.lock_initial_delay,
            max_delay: config.lock_max_delay,
        }
    }

    /// Acquire the lock for a session id, creating the record if absent.
    ///
    /// Blocks the calling task between attempts (`tokio::time::sleep`, so an
    /// outer deadline can still cancel the whole future). The per-attempt
    /// delay starts at the configured initial value and doubles after each
    /// contended attempt up to the ceiling; the total slept time never
    /// exceeds the wait budget.
    ///
    /// # Errors
    ///
    /// [`SessionError::LockTimeout`] once the budget is exhausted. Store
    /// faults other than the expected duplicate-key contention signal
    /// propagate immediately.
    pub async fn acquire(&self, sid: &str) -> SessionResult<()> {
        let mut delay = self.initial_delay;
        let mut remaining = self.wait_budget;

        loop {
            if self.try_acquire(sid).await? {
                debug!(sid, "session lock acquired");
                return Ok(());
            }

            if remaining.is_zero() {
                warn!(sid, "session lock wait budget exhausted");
                return Err(SessionError::LockTimeout(sid.to_string()));
            }

            let wait = delay.min(remaining);
            debug!(sid, wait_ms = wait.as_millis() as u64, "session lock contended, backing off");
            tokio::time::sleep(wait).await;
            remaining -= wait;
            delay = (delay * 2).min(self.max_delay);
        }
    }

    /// One acquisition attempt. `Ok(false)` is contention.
    async fn try_acquire(&self, sid: &str) -> SessionResult<bool> {
        let free = Filter::new().eq(FIELD_SID, sid).eq(FIELD_LOCK, 0);

        if self.store.find_one(&free).await?.is_some() {
            // Conditional update keyed on the same filter: a concurrent
            // winner leaves us with zero modified documents instead of a
            // silent overwrite.
            let report = self
                .store
                .update_one(&free, &FieldSet::new().set(FIELD_LOCK, 1), false)
                .await?;
            return Ok(report.modified == 1);
        }

        // No free record: insert-if-absent. Succeeds only when no document
        // with this id exists yet.
        let mut document = Document::new();
        document.insert(FIELD_SID.to_string(), Value::from(sid));
        document.insert(FIELD_LOCK.to_string(), Value::from(1));

        match self.store.insert_one(document).await {
            Ok(()) => Ok(true),
            Err(DocumentError::DuplicateKey { index }) if index == INDEX_SID => {
                // Another caller created (and possibly locked) the record
                // between our find and our insert.
                Ok(false)
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Unconditionally release the lock for a session id.
    ///
    /// The normal release path is a session write, which resets the flag as
    /// part of its own atomic update; this is the explicit out-of-band path
    /// for hosts that abandoned a request after `read`.
    pub async fn release(&self, sid: &str) -> SessionResult<()> {
        let filter = Filter::new().eq(FIELD_SID, sid);
        self.store
            .update_one(&filter, &FieldSet::new().set(FIELD_LOCK, 0), false)
            .await?;
        debug!(sid, "session lock released");
        Ok(())
    }
}
