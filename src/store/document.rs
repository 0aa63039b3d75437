//! Remote document backend contract.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

/// Field map of a single document.
pub type Fields = serde_json::Map<String, Value>;

#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Equality filter on a top-level field.
#[derive(Clone, Debug, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<usize>,
}

impl Query {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn filter_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.to_string(),
            value: value.into(),
        });
        self
    }

    #[must_use]
    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by.push(OrderBy {
            field: field.to_string(),
            direction,
        });
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Document backend error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// Network failure or service outage.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// Security rules or credentials rejected the call.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The document does not exist (only for calls that require it).
    #[error("document not found")]
    NotFound,

    /// The call did not complete in time.
    #[error("backend call timed out after {0:?}")]
    Timeout(Duration),

    /// The backend answered with something we could not read.
    #[error("failed to decode backend response: {0}")]
    Decode(String),

    #[error("backend error: {0}")]
    Other(String),
}

impl BackendError {
    #[inline]
    pub fn other<E: std::fmt::Display>(err: E) -> Self {
        Self::Other(err.to_string())
    }

    /// Short, stable label used in log fields.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "unavailable",
            Self::PermissionDenied(_) => "permission_denied",
            Self::NotFound => "not_found",
            Self::Timeout(_) => "timeout",
            Self::Decode(_) => "decode",
            Self::Other(_) => "other",
        }
    }
}

/// Keyed document store.
///
/// Implementations must be thread-safe (`Send + Sync`); one backend is shared
/// by every session of the process.
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    /// Read a document, `Ok(None)` when it does not exist.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, BackendError>;

    /// Write a document. Without `merge` the stored fields are replaced;
    /// with `merge` only the given fields are overwritten.
    async fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
        merge: bool,
    ) -> Result<(), BackendError>;

    /// Overwrite the given fields of an existing document.
    ///
    /// # Errors
    /// Returns `BackendError::NotFound` when the document does not exist.
    async fn update(&self, collection: &str, id: &str, fields: Fields)
        -> Result<(), BackendError>;

    async fn delete(&self, collection: &str, id: &str) -> Result<(), BackendError>;

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, BackendError>;
}

#[async_trait]
impl<B: DocumentBackend + ?Sized> DocumentBackend for Arc<B> {
    #[inline]
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, BackendError> {
        (**self).get(collection, id).await
    }

    #[inline]
    async fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
        merge: bool,
    ) -> Result<(), BackendError> {
        (**self).set(collection, id, fields, merge).await
    }

    #[inline]
    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> Result<(), BackendError> {
        (**self).update(collection, id, fields).await
    }

    #[inline]
    async fn delete(&self, collection: &str, id: &str) -> Result<(), BackendError> {
        (**self).delete(collection, id).await
    }

    #[inline]
    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, BackendError> {
        (**self).query(collection, query).await
    }
}
