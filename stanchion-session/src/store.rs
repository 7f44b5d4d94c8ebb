//! Lifecycle surface and the document-backed session store.

use crate::config::SessionConfig;
use crate::error::SessionResult;
use crate::lock::LockManager;
use crate::record::{
    FIELD_EXPIRY, FIELD_LOCK, FIELD_SID, INDEX_EXPIRY, INDEX_SID, INDEX_SID_LOCK, SessionRecord,
};
use crate::repository::SessionRepository;
use crate::sweep::ExpirationSweeper;
use async_trait::async_trait;
use stanchion_document::{DocumentStore, IndexSpec};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// The session lifecycle callbacks a host invokes.
///
/// The host owns the calling contract: `open` once per request before
/// anything else, then `read`, then at most one of `write`/`destroy`, then
/// `close`; `gc` whenever it pleases. The store conforms to the contract
/// but never drives it: the host is a boundary, not an in-process peer,
/// and the session id is explicit on every call rather than ambient state.
///
/// # Examples
///
/// ```ignore
/// use stanchion_session::{DocumentSessionStore, SessionConfig, SessionStore};
/// use stanchion_document::MemoryDocumentStore;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), stanchion_session::SessionError> {
/// let config = SessionConfig::new("app", "sessions")?;
/// let store = DocumentSessionStore::connect(Arc::new(MemoryDocumentStore::new()), config).await?;
///
/// store.open("/", "session").await?;
/// let payload = store.read("abc").await?;          // locks + fetches
/// store.write("abc", b"payload").await?;           // merges + releases
/// store.close().await?;
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Called once per request before any other callback. The connection is
    /// pre-established, so this is informational.
    async fn open(&self, save_path: &str, session_name: &str) -> SessionResult<bool>;

    /// Called once per request after all other callbacks.
    async fn close(&self) -> SessionResult<bool>;

    /// Hydrate session state: acquire the lock, then fetch the payload.
    ///
    /// An absent, expired, or soft-deleted session reads as an empty
    /// payload. A lock timeout is an error the host must decide how to
    /// degrade.
    async fn read(&self, sid: &str) -> SessionResult<Vec<u8>>;

    /// Persist mutated state, implicitly releasing the lock.
    ///
    /// `Ok(false)` means the store did not acknowledge the write; the
    /// session does not persist this request but nothing crashed.
    async fn write(&self, sid: &str, payload: &[u8]) -> SessionResult<bool>;

    /// Remove a session on explicit logout/invalidation.
    async fn destroy(&self, sid: &str) -> SessionResult<bool>;

    /// Garbage collection: soft-delete expired sessions.
    async fn gc(&self) -> SessionResult<bool>;
}

/// Session store over a [`DocumentStore`].
///
/// Wires the lock manager, repository, and sweeper into the
/// [`SessionStore`] lifecycle and owns one-time index setup. Records
/// fetched by `read` are retained per session id and threaded into the next
/// `write` of that id as its merge base.
pub struct DocumentSessionStore<S: DocumentStore> {
    config: SessionConfig,
    lock: LockManager<S>,
    repository: SessionRepository<S>,
    sweeper: ExpirationSweeper<S>,
    retained: Mutex<HashMap<String, SessionRecord>>,
}

impl<S: DocumentStore> std::fmt::Debug for DocumentSessionStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentSessionStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S: DocumentStore> DocumentSessionStore<S> {
    /// Validate the configuration, create the collection indexes, and wire
    /// the store.
    ///
    /// Index setup runs once here: a range index on `expiry` (non-unique,
    /// since many sessions legitimately share an expiry second), the unique
    /// session-id index that turns racing creates into duplicate-key
    /// signals, and a secondary `(sid, lock)` index serving the free-lock
    /// query.
    ///
    /// # Errors
    ///
    /// [`SessionError::Config`](crate::SessionError::Config) for an
    /// unusable configuration; store faults from index creation propagate,
    /// since no session handling is possible without the indexes.
    pub async fn connect(store: Arc<S>, config: SessionConfig) -> SessionResult<Self> {
        config.validate()?;

        store
            .ensure_index(&IndexSpec::non_unique(INDEX_EXPIRY, [FIELD_EXPIRY]))
            .await?;
        store
            .ensure_index(&IndexSpec::unique(INDEX_SID, [FIELD_SID]))
            .await?;
        store
            .ensure_index(&IndexSpec::non_unique(INDEX_SID_LOCK, [FIELD_SID, FIELD_LOCK]))
            .await?;

        debug!(
            database = %config.database,
            collection = %config.collection,
            "session store connected"
        );

        Ok(Self {
            lock: LockManager::new(store.clone(), &config),
            repository: SessionRepository::new(store.clone(), &config),
            sweeper: ExpirationSweeper::new(store),
            retained: Mutex::new(HashMap::new()),
            config,
        })
    }

    /// The configuration this store was built with.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Release the lock for a session id without writing.
    ///
    /// Out-of-band escape hatch for hosts that abandoned a request after
    /// `read`; the routine release path is `write`.
    pub async fn unlock(&self, sid: &str) -> SessionResult<()> {
        self.retained.lock().await.remove(sid);
        self.lock.release(sid).await
    }
}

#[async_trait]
impl<S: DocumentStore> SessionStore for DocumentSessionStore<S> {
    async fn open(&self, save_path: &str, session_name: &str) -> SessionResult<bool> {
        debug!(save_path, session_name, "session opened");
        Ok(true)
    }

    async fn close(&self) -> SessionResult<bool> {
        Ok(true)
    }

    async fn read(&self, sid: &str) -> SessionResult<Vec<u8>> {
        self.lock.acquire(sid).await?;

        match self.repository.fetch(sid).await? {
            Some(record) => {
                let payload = record.data.clone();
                self.retained.lock().await.insert(sid.to_string(), record);
                Ok(payload)
            }
            None => {
                // Nothing to merge over on the next write.
                self.retained.lock().await.remove(sid);
                Ok(Vec::new())
            }
        }
    }

    async fn write(&self, sid: &str, payload: &[u8]) -> SessionResult<bool> {
        let prior = self.retained.lock().await.remove(sid);
        self.repository.store(sid, payload, prior.as_ref()).await
    }

    async fn destroy(&self, sid: &str) -> SessionResult<bool> {
        self.retained.lock().await.remove(sid);
        self.repository.discard(sid).await
    }

    async fn gc(&self) -> SessionResult<bool> {
        self.sweeper.sweep_expired().await
    }
}

/// Generate a new unique session id.
///
/// Convenience for hosts without an id policy of their own; id generation
/// is otherwise the host's concern.
pub fn generate_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SessionError;
    use crate::record::FIELD_ACTIVE;
    use serde_json::json;
    use stanchion_document::{FieldSet, Filter, MemoryDocumentStore};
    use std::time::Duration;

    async fn connected() -> (Arc<MemoryDocumentStore>, DocumentSessionStore<MemoryDocumentStore>) {
        let store = Arc::new(MemoryDocumentStore::new());
        let config = SessionConfig::new("app", "sessions")
            .unwrap()
            .with_lock_wait(Duration::from_millis(100))
            .with_lock_backoff(Duration::from_millis(1), Duration::from_millis(16));
        let sessions = DocumentSessionStore::connect(store.clone(), config).await.unwrap();
        (store, sessions)
    }

    #[tokio::test]
    async fn test_connect_rejects_unusable_config() {
        let store = Arc::new(MemoryDocumentStore::new());
        let err = DocumentSessionStore::connect(store, SessionConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Config(_)));
    }

    #[tokio::test]
    async fn test_read_empty_then_write_then_read() {
        let (_store, sessions) = connected().await;

        assert!(sessions.open("/", "session").await.unwrap());
        assert!(sessions.read("abc").await.unwrap().is_empty());
        assert!(sessions.write("abc", b"state").await.unwrap());
        assert_eq!(sessions.read("abc").await.unwrap(), b"state");
        assert!(sessions.close().await.unwrap());
    }

    #[tokio::test]
    async fn test_write_without_read_constructs_fresh_record() {
        let (store, sessions) = connected().await;

        assert!(sessions.write("abc", b"fresh").await.unwrap());

        let document = store
            .find_one(&Filter::new().eq(FIELD_SID, "abc"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(document[FIELD_LOCK], json!(0));
        assert_eq!(document[FIELD_ACTIVE], json!(1));
    }

    #[tokio::test]
    async fn test_write_releases_read_lock() {
        let (store, sessions) = connected().await;

        sessions.write("abc", b"v1").await.unwrap();
        sessions.read("abc").await.unwrap();

        let locked = store
            .find_one(&Filter::new().eq(FIELD_SID, "abc"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(locked[FIELD_LOCK], json!(1));

        sessions.write("abc", b"v2").await.unwrap();
        let released = store
            .find_one(&Filter::new().eq(FIELD_SID, "abc"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(released[FIELD_LOCK], json!(0));
    }

    #[tokio::test]
    async fn test_second_reader_times_out_while_lock_held() {
        let (_store, sessions) = connected().await;

        sessions.write("abc", b"state").await.unwrap();
        sessions.read("abc").await.unwrap();

        let err = sessions.read("abc").await.unwrap_err();
        assert!(matches!(err, SessionError::LockTimeout(_)));
    }

    #[tokio::test]
    async fn test_unlock_frees_an_abandoned_read() {
        let (_store, sessions) = connected().await;

        sessions.write("abc", b"state").await.unwrap();
        sessions.read("abc").await.unwrap();
        sessions.unlock("abc").await.unwrap();

        assert_eq!(sessions.read("abc").await.unwrap(), b"state");
    }

    #[tokio::test]
    async fn test_destroy_removes_and_is_idempotent() {
        let (store, sessions) = connected().await;

        sessions.write("abc", b"state").await.unwrap();
        assert!(sessions.destroy("abc").await.unwrap());
        assert!(sessions.destroy("abc").await.unwrap());

        assert!(store
            .find_one(&Filter::new().eq(FIELD_SID, "abc"))
            .await
            .unwrap()
            .is_none());
        assert!(sessions.read("abc").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_gc_soft_deletes_expired_sessions() {
        let (store, sessions) = connected().await;

        sessions.write("abc", b"state").await.unwrap();
        // Force the record into the past without touching the clock.
        store
            .update_one(
                &Filter::new().eq(FIELD_SID, "abc"),
                &FieldSet::new().set(FIELD_EXPIRY, 1),
                false,
            )
            .await
            .unwrap();

        // Expired but pre-sweep: invisible to read already.
        assert!(sessions.read("abc").await.unwrap().is_empty());
        sessions.unlock("abc").await.unwrap();

        assert!(sessions.gc().await.unwrap());

        let document = store
            .find_one(&Filter::new().eq(FIELD_SID, "abc"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(document[FIELD_ACTIVE], json!(0));
        assert!(sessions.read("abc").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_generate_session_id_is_unique() {
        assert_ne!(generate_session_id(), generate_session_id());
    }
}
