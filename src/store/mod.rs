//! Storage backends: the remote document store and the device-local store.

pub mod document;
pub mod firestore;
pub mod local;
pub mod memory;

pub use self::document::{
    BackendError, Direction, Document, DocumentBackend, Fields, Filter, OrderBy, Query,
};
pub use self::firestore::{BearerToken, FirestoreBackend};
pub use self::local::{FileLocalStore, LocalStore, LocalStoreError, MemoryLocalStore};
pub use self::memory::MemoryDocumentStore;
