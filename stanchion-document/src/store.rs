//! Document store trait definition.

use crate::document::{DeleteReport, Document, FieldSet, Filter, IndexSpec, UpdateReport};
use crate::error::DocumentResult;
use async_trait::async_trait;

/// Atomic operations over one keyed document collection.
///
/// Each method is a single atomic step from the caller's point of view: a
/// conditional update either observes the filter and applies the field set,
/// or does nothing. There is no multi-operation transaction; callers that
/// need mutual exclusion build it from conditional updates and unique-index
/// inserts.
///
/// # Examples
///
/// ```
/// use stanchion_document::{DocumentStore, Filter, FieldSet, MemoryDocumentStore};
///
/// # async fn example() -> Result<(), stanchion_document::DocumentError> {
/// let store = MemoryDocumentStore::new();
/// let report = store
///     .update_one(&Filter::new().eq("sid", "abc"), &FieldSet::new().set("lock", 1), true)
///     .await?;
/// assert!(report.upserted);
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Find at most one document matching the filter.
    async fn find_one(&self, filter: &Filter) -> DocumentResult<Option<Document>>;

    /// Insert a document.
    ///
    /// A unique-index violation surfaces as
    /// [`DocumentError::DuplicateKey`](crate::DocumentError::DuplicateKey)
    /// naming the violated index; every other failure is a store fault.
    async fn insert_one(&self, document: Document) -> DocumentResult<()>;

    /// Atomically apply a field set to at most one document matching the
    /// filter.
    ///
    /// With `upsert`, a miss inserts a fresh document seeded from the
    /// filter's equality clauses plus the field set. Unique indexes are
    /// enforced on that insert exactly as on [`insert_one`](Self::insert_one).
    async fn update_one(
        &self,
        filter: &Filter,
        update: &FieldSet,
        upsert: bool,
    ) -> DocumentResult<UpdateReport>;

    /// Atomically apply a field set to every document matching the filter.
    async fn update_many(&self, filter: &Filter, update: &FieldSet)
    -> DocumentResult<UpdateReport>;

    /// Remove at most one document matching the filter. Removing nothing is
    /// not an error.
    async fn delete_one(&self, filter: &Filter) -> DocumentResult<DeleteReport>;

    /// Create an index if it does not exist. Re-declaring an index with the
    /// same name and shape is a no-op; re-declaring with a different shape
    /// is an error.
    async fn ensure_index(&self, index: &IndexSpec) -> DocumentResult<()>;
}
