use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use mongodb::bson::{doc, Bson};
use mongodb::options::{ClientOptions, FindOptions, IndexOptions};
use mongodb::{Client, Collection, IndexModel};
use std::time::Duration;

use crate::model::{Direction, Quad};
use crate::store::traits::{QuadStore, StoreError};

const BACKEND: &str = "mongo";
const DATABASE: &str = "cayley";
const COLLECTION: &str = "quads";

/// Quads kept one document per record in `cayley.quads`.
#[derive(Debug, Clone)]
pub struct MongoStore {
    client: Client,
    quads: Collection<Quad>,
}

/// Accept bare `host:port` strings as well as full connection URIs.
fn connection_uri(path: &str) -> String {
    if path.starts_with("mongodb://") || path.starts_with("mongodb+srv://") {
        path.to_string()
    } else {
        format!("mongodb://{path}")
    }
}

impl MongoStore {
    /// Connect and ping the server so an unreachable backend fails here
    /// rather than on the first request.
    pub async fn connect(path: &str, timeout: Duration) -> Result<Self, StoreError> {
        let connection_error = |e: mongodb::error::Error| StoreError::Connection {
            backend: BACKEND,
            path: path.to_string(),
            reason: e.to_string(),
        };

        let mut options = ClientOptions::parse(connection_uri(path))
            .await
            .map_err(connection_error)?;
        options.app_name = Some("ogma-prime".to_string());
        options.server_selection_timeout = Some(timeout);
        options.connect_timeout = Some(timeout);

        let client = Client::with_options(options).map_err(connection_error)?;
        let database = client.database(DATABASE);
        database
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(connection_error)?;

        log::info!("Connected to MongoDB at {}", path);
        Ok(Self {
            quads: database.collection(COLLECTION),
            client,
        })
    }

    /// Create the lookup indexes; existing indexes are left alone.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        let indexes = ["subject", "object", "predicate"].map(|field| {
            IndexModel::builder()
                .keys(doc! { field: 1 })
                .options(IndexOptions::builder().name(format!("quads_{field}_idx")).build())
                .build()
        });
        self.quads
            .create_indexes(indexes, None)
            .await
            .map_err(|e| StoreError::backend(BACKEND, e))?;
        log::info!("Quad indexes ready");
        Ok(())
    }
}

#[async_trait::async_trait]
impl QuadStore for MongoStore {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    async fn contains_vertex(&self, vertex: &str) -> Result<bool, StoreError> {
        let found = self
            .quads
            .find_one(
                doc! { "$or": [ { "subject": vertex }, { "object": vertex } ] },
                None,
            )
            .await
            .map_err(|e| StoreError::backend(BACKEND, e))?;
        Ok(found.is_some())
    }

    async fn vertices(&self, limit: usize) -> Result<Vec<String>, StoreError> {
        let mut vertices = Vec::new();
        for field in ["subject", "object"] {
            let values = self
                .quads
                .distinct(field, None, None)
                .await
                .map_err(|e| StoreError::backend(BACKEND, e))?;
            for value in values {
                if let Bson::String(vertex) = value {
                    if !vertices.contains(&vertex) {
                        vertices.push(vertex);
                    }
                }
            }
        }
        vertices.sort();
        vertices.truncate(limit);
        Ok(vertices)
    }

    async fn quads_at(&self, direction: Direction, vertex: &str) -> Result<Vec<Quad>, StoreError> {
        let options = FindOptions::builder()
            .sort(doc! { "predicate": 1, direction.reverse().field(): 1 })
            .build();
        self.quads
            .find(doc! { direction.field(): vertex }, options)
            .await
            .map_err(|e| StoreError::backend(BACKEND, e))?
            .try_collect()
            .await
            .map_err(|e| StoreError::backend(BACKEND, e))
    }

    async fn quad_count(&self) -> Result<u64, StoreError> {
        self.quads
            .count_documents(None, None)
            .await
            .map_err(|e| StoreError::backend(BACKEND, e))
    }

    fn scan(&self) -> BoxStream<'_, Result<Quad, StoreError>> {
        let quads = self.quads.clone();
        stream::once(async move { quads.find(None, None).await })
            .map_ok(|cursor| cursor.map_err(|e| StoreError::backend(BACKEND, e)))
            .map_err(|e| StoreError::backend(BACKEND, e))
            .try_flatten()
            .boxed()
    }

    async fn close(&self) {
        self.client.clone().shutdown().await;
    }
}
