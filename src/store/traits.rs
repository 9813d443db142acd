use futures::stream::BoxStream;

use crate::model::{Direction, Quad};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unsupported database type {0:?} (expected memory, postgres or mongo)")]
    UnsupportedBackend(String),

    #[error("cannot connect to {backend} store at {path}: {reason}")]
    Connection {
        backend: &'static str,
        path: String,
        reason: String,
    },

    #[error("dataset {path}, line {line}: {reason}")]
    Dataset {
        path: String,
        line: usize,
        reason: String,
    },

    #[error("{backend} store error: {reason}")]
    Backend {
        backend: &'static str,
        reason: String,
    },
}

impl StoreError {
    pub fn backend(backend: &'static str, err: impl std::fmt::Display) -> Self {
        StoreError::Backend {
            backend,
            reason: err.to_string(),
        }
    }
}

/// Read access to a quad-shaped graph store.
///
/// Implementations must be safe to share between concurrently running
/// requests; any locking is their own business.
#[async_trait::async_trait]
pub trait QuadStore: Send + Sync {
    /// Backend identifier, e.g. `"memory"`.
    fn backend(&self) -> &'static str;

    /// True if the vertex appears as subject or object of any quad.
    async fn contains_vertex(&self, vertex: &str) -> Result<bool, StoreError>;

    /// Distinct vertex names, at most `limit` of them.
    async fn vertices(&self, limit: usize) -> Result<Vec<String>, StoreError>;

    /// Quads whose `direction` end is `vertex`.
    async fn quads_at(&self, direction: Direction, vertex: &str) -> Result<Vec<Quad>, StoreError>;

    async fn quad_count(&self) -> Result<u64, StoreError>;

    /// Stream every stored quad.
    fn scan(&self) -> BoxStream<'_, Result<Quad, StoreError>>;

    /// Release connections. Called once when the serving process stops.
    async fn close(&self) {}
}
