//! Keyed document collection abstraction for Stanchion.
//!
//! A [`DocumentStore`] exposes the handful of atomic primitives session
//! storage is built from: find-one, insert (with unique-index violations as
//! a typed signal), conditional single-document update, one-shot
//! multi-document update, delete, and index creation. Anything the session
//! layer needs beyond those (mutual exclusion, expiry filtering, soft
//! deletes) is composed *on top of* these primitives rather than added to
//! the trait.
//!
//! The crate ships one backend, [`MemoryDocumentStore`], used by the test
//! suites and usable as an embedded store. Production deployments implement
//! [`DocumentStore`] over their replicated database driver.
//!
//! # Examples
//!
//! ```
//! use stanchion_document::{DocumentStore, FieldSet, Filter, IndexSpec, MemoryDocumentStore};
//!
//! # async fn example() -> Result<(), stanchion_document::DocumentError> {
//! let store = MemoryDocumentStore::new();
//! store.ensure_index(&IndexSpec::unique("sid_unique", ["sid"])).await?;
//!
//! // Insert-if-absent: a duplicate key here is a signal, not a fault.
//! store
//!     .update_one(
//!         &Filter::new().eq("sid", "abc"),
//!         &FieldSet::new().set("lock", 1),
//!         true,
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod document;
pub mod error;
pub mod memory;
pub mod store;

pub use document::{
    Clause, Comparison, DeleteReport, Document, FieldSet, Filter, IndexSpec, UpdateReport,
};
pub use error::{DocumentError, DocumentResult};
pub use memory::MemoryDocumentStore;
pub use store::DocumentStore;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::document::{
        DeleteReport, Document, FieldSet, Filter, IndexSpec, UpdateReport,
    };
    pub use crate::error::{DocumentError, DocumentResult};
    pub use crate::memory::MemoryDocumentStore;
    pub use crate::store::DocumentStore;
}
