//! In-memory document store.

use crate::document::{DeleteReport, Document, FieldSet, Filter, IndexSpec, UpdateReport};
use crate::error::{DocumentError, DocumentResult};
use crate::store::DocumentStore;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory [`DocumentStore`] backend.
///
/// Every operation holds the collection lock for its whole body, which is
/// what makes conditional updates and unique-index inserts atomic. Suitable
/// for tests and single-process embedding; a replicated database driver
/// implementing the same trait takes its place in production.
///
/// # Examples
///
/// ```
/// use stanchion_document::{DocumentStore, Filter, MemoryDocumentStore};
/// use serde_json::json;
///
/// # async fn example() -> Result<(), stanchion_document::DocumentError> {
/// let store = MemoryDocumentStore::new();
/// store.insert_one(json!({"sid": "abc"}).as_object().cloned().unwrap()).await?;
///
/// let found = store.find_one(&Filter::new().eq("sid", "abc")).await?;
/// assert!(found.is_some());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    inner: Arc<RwLock<Collection>>,
}

#[derive(Default)]
struct Collection {
    documents: Vec<Document>,
    indexes: Vec<IndexSpec>,
}

impl Collection {
    fn key_tuple(document: &Document, keys: &[String]) -> Vec<Value> {
        keys.iter()
            .map(|key| document.get(key).cloned().unwrap_or(Value::Null))
            .collect()
    }

    /// Name of the first unique index the candidate document would violate.
    /// `exclude` skips the document being replaced during an update.
    fn violated_index(&self, candidate: &Document, exclude: Option<usize>) -> Option<String> {
        self.indexes
            .iter()
            .filter(|index| index.unique)
            .find(|index| {
                let tuple = Self::key_tuple(candidate, &index.keys);
                self.documents
                    .iter()
                    .enumerate()
                    .any(|(position, existing)| {
                        Some(position) != exclude
                            && Self::key_tuple(existing, &index.keys) == tuple
                    })
            })
            .map(|index| index.name.clone())
    }
}

impl MemoryDocumentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count documents matching the filter. Test and maintenance helper, not
    /// part of the store trait.
    pub async fn count(&self, filter: &Filter) -> usize {
        let collection = self.inner.read().await;
        collection
            .documents
            .iter()
            .filter(|document| filter.matches(document))
            .count()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn find_one(&self, filter: &Filter) -> DocumentResult<Option<Document>> {
        let collection = self.inner.read().await;
        Ok(collection
            .documents
            .iter()
            .find(|document| filter.matches(document))
            .cloned())
    }

    async fn insert_one(&self, document: Document) -> DocumentResult<()> {
        let mut collection = self.inner.write().await;
        if let Some(index) = collection.violated_index(&document, None) {
            return Err(DocumentError::DuplicateKey { index });
        }
        collection.documents.push(document);
        Ok(())
    }

    async fn update_one(
        &self,
        filter: &Filter,
        update: &FieldSet,
        upsert: bool,
    ) -> DocumentResult<UpdateReport> {
        let mut collection = self.inner.write().await;

        let position = collection
            .documents
            .iter()
            .position(|document| filter.matches(document));

        match position {
            Some(position) => {
                let mut updated = collection.documents[position].clone();
                let changed = update.apply(&mut updated);
                if changed {
                    if let Some(index) = collection.violated_index(&updated, Some(position)) {
                        return Err(DocumentError::DuplicateKey { index });
                    }
                    collection.documents[position] = updated;
                }
                Ok(UpdateReport {
                    acknowledged: true,
                    matched: 1,
                    modified: u64::from(changed),
                    upserted: false,
                })
            }
            None if upsert => {
                let mut document = Document::new();
                for (field, value) in filter.equalities() {
                    document.insert(field.to_string(), value.clone());
                }
                update.apply(&mut document);
                if let Some(index) = collection.violated_index(&document, None) {
                    return Err(DocumentError::DuplicateKey { index });
                }
                collection.documents.push(document);
                Ok(UpdateReport {
                    acknowledged: true,
                    matched: 0,
                    modified: 0,
                    upserted: true,
                })
            }
            None => Ok(UpdateReport {
                acknowledged: true,
                ..UpdateReport::default()
            }),
        }
    }

    async fn update_many(
        &self,
        filter: &Filter,
        update: &FieldSet,
    ) -> DocumentResult<UpdateReport> {
        let mut collection = self.inner.write().await;

        let mut matched = 0;
        let mut modified = 0;
        for position in 0..collection.documents.len() {
            if !filter.matches(&collection.documents[position]) {
                continue;
            }
            matched += 1;
            let mut updated = collection.documents[position].clone();
            if update.apply(&mut updated) {
                if let Some(index) = collection.violated_index(&updated, Some(position)) {
                    return Err(DocumentError::DuplicateKey { index });
                }
                collection.documents[position] = updated;
                modified += 1;
            }
        }

        Ok(UpdateReport {
            acknowledged: true,
            matched,
            modified,
            upserted: false,
        })
    }

    async fn delete_one(&self, filter: &Filter) -> DocumentResult<DeleteReport> {
        let mut collection = self.inner.write().await;

        let position = collection
            .documents
            .iter()
            .position(|document| filter.matches(document));

        let deleted = match position {
            Some(position) => {
                collection.documents.remove(position);
                1
            }
            None => 0,
        };

        Ok(DeleteReport {
            acknowledged: true,
            deleted,
        })
    }

    async fn ensure_index(&self, index: &IndexSpec) -> DocumentResult<()> {
        if index.keys.is_empty() {
            return Err(DocumentError::Index(format!(
                "index '{}' declares no key fields",
                index.name
            )));
        }

        let mut collection = self.inner.write().await;

        if let Some(existing) = collection
            .indexes
            .iter()
            .find(|existing| existing.name == index.name)
        {
            if existing == index {
                return Ok(());
            }
            return Err(DocumentError::Index(format!(
                "index '{}' already exists with a different shape",
                index.name
            )));
        }

        if index.unique {
            for (position, document) in collection.documents.iter().enumerate() {
                let tuple = Collection::key_tuple(document, &index.keys);
                let collides = collection.documents[..position]
                    .iter()
                    .any(|other| Collection::key_tuple(other, &index.keys) == tuple);
                if collides {
                    return Err(DocumentError::Index(format!(
                        "existing documents violate unique index '{}'",
                        index.name
                    )));
                }
            }
        }

        collection.indexes.push(index.clone());
        Ok(())
    }
}
