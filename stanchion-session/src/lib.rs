//! Session storage over a replicated document database.
//!
//! One document per session carries the payload plus three coordination
//! fields: a `lock` flag giving one reader-then-writer at a time exclusive
//! write intent, an `active` flag distinguishing live records from
//! soft-deleted ones, and an `expiry` timestamp bounding visibility. All
//! coordination is externalized to the document store's atomic per-document
//! operations; independent request handlers share nothing in process.
//!
//! The moving parts, bottom up:
//!
//! - [`SessionRecord`] - the stored shape and its codec.
//! - [`LockManager`] - advisory per-id locks from conditional updates and
//!   insert-if-absent, with bounded exponential backoff.
//! - [`SessionRepository`] - expiry/liveness-filtered reads, merge-on-write
//!   persistence, removal.
//! - [`ExpirationSweeper`] - one-round-trip soft delete of expired records.
//! - [`DocumentSessionStore`] - wires the above into the [`SessionStore`]
//!   lifecycle the host invokes.
//!
//! # Examples
//!
//! ```ignore
//! use stanchion_session::{DocumentSessionStore, SessionConfig, SessionStore};
//! use stanchion_document::MemoryDocumentStore;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), stanchion_session::SessionError> {
//!     let config = SessionConfig::new("app", "sessions")?
//!         .with_lifetime(Duration::from_secs(3600));
//!
//!     let backend = Arc::new(MemoryDocumentStore::new());
//!     let sessions = DocumentSessionStore::connect(backend, config).await?;
//!
//!     // One request's lifecycle, driven by the host.
//!     sessions.open("/", "session").await?;
//!     let state = sessions.read("client-sid").await?;
//!     // ... host mutates state in memory ...
//!     sessions.write("client-sid", &state).await?;
//!     sessions.close().await?;
//!
//!     // Periodically, at the host's discretion.
//!     sessions.gc().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod lock;
pub mod record;
pub mod repository;
pub mod store;
pub mod sweep;

pub use config::{ServerAddress, SessionConfig};
pub use error::{SessionError, SessionResult};
pub use lock::LockManager;
pub use record::{
    FIELD_ACTIVE, FIELD_DATA, FIELD_EXPIRY, FIELD_LOCK, FIELD_SID, INDEX_EXPIRY, INDEX_SID,
    INDEX_SID_LOCK, SessionRecord,
};
pub use repository::SessionRepository;
pub use store::{DocumentSessionStore, SessionStore, generate_session_id};
pub use sweep::ExpirationSweeper;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{ServerAddress, SessionConfig};
    pub use crate::error::{SessionError, SessionResult};
    pub use crate::lock::LockManager;
    pub use crate::record::SessionRecord;
    pub use crate::repository::SessionRepository;
    pub use crate::store::{DocumentSessionStore, SessionStore, generate_session_id};
    pub use crate::sweep::ExpirationSweeper;
}
