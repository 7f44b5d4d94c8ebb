// Stanchion - a session store over a replicated document database.
//
// This library provides create/read/update/delete semantics for opaque
// session payloads with per-session cooperative locking and soft-delete
// expiration, coordinated entirely through the document store's atomic
// per-document operations.

// Re-export the session store core
pub use stanchion_session::*;

// Re-export the document collection abstraction
pub use stanchion_document;

pub use stanchion_document::{
    DocumentError, DocumentResult, DocumentStore, MemoryDocumentStore,
};
