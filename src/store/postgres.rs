use futures::stream::{BoxStream, StreamExt};
use sqlx::{postgres::PgPoolOptions, postgres::PgRow, PgPool, Row};
use std::time::Duration;

use crate::model::{Direction, Quad};
use crate::store::traits::{QuadStore, StoreError};

const BACKEND: &str = "postgres";

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS quads (
        subject   TEXT NOT NULL,
        predicate TEXT NOT NULL,
        object    TEXT NOT NULL,
        label     TEXT NOT NULL DEFAULT '',
        PRIMARY KEY (subject, predicate, object, label)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS quads_object_idx ON quads (object)",
    "CREATE INDEX IF NOT EXISTS quads_predicate_idx ON quads (predicate)",
];

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store with the given database URL
    pub async fn new(database_url: &str, timeout: Duration) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .acquire_timeout(timeout)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Connection {
                backend: BACKEND,
                path: database_url.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    /// Create the quad table and its indexes if they are missing.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::backend(BACKEND, e))?;
        }
        log::info!("Quad schema ready");
        Ok(())
    }
}

fn quad_from_row(row: &PgRow) -> Result<Quad, sqlx::Error> {
    Ok(Quad {
        subject: row.try_get("subject")?,
        predicate: row.try_get("predicate")?,
        object: row.try_get("object")?,
        label: row.try_get("label")?,
    })
}

#[async_trait::async_trait]
impl QuadStore for PostgresStore {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    async fn contains_vertex(&self, vertex: &str) -> Result<bool, StoreError> {
        let row = sqlx::query(
            "SELECT EXISTS (SELECT 1 FROM quads WHERE subject = $1 OR object = $1) AS found",
        )
        .bind(vertex)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::backend(BACKEND, e))?;

        row.try_get("found")
            .map_err(|e| StoreError::backend(BACKEND, e))
    }

    async fn vertices(&self, limit: usize) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT vertex FROM (
                SELECT subject AS vertex FROM quads
                UNION
                SELECT object AS vertex FROM quads
            ) AS v
            ORDER BY vertex
            LIMIT $1
            "#,
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::backend(BACKEND, e))?;

        rows.iter()
            .map(|row| row.try_get("vertex"))
            .collect::<Result<_, _>>()
            .map_err(|e| StoreError::backend(BACKEND, e))
    }

    async fn quads_at(&self, direction: Direction, vertex: &str) -> Result<Vec<Quad>, StoreError> {
        let sql = format!(
            "SELECT subject, predicate, object, label FROM quads WHERE {} = $1 ORDER BY predicate, {}",
            direction.field(),
            direction.reverse().field()
        );
        let rows = sqlx::query(&sql)
            .bind(vertex)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::backend(BACKEND, e))?;

        rows.iter()
            .map(quad_from_row)
            .collect::<Result<_, _>>()
            .map_err(|e| StoreError::backend(BACKEND, e))
    }

    async fn quad_count(&self) -> Result<u64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM quads")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::backend(BACKEND, e))?;
        let count: i64 = row.try_get("n").map_err(|e| StoreError::backend(BACKEND, e))?;
        Ok(count.max(0) as u64)
    }

    fn scan(&self) -> BoxStream<'_, Result<Quad, StoreError>> {
        sqlx::query("SELECT subject, predicate, object, label FROM quads ORDER BY subject, predicate")
            .fetch(&self.pool)
            .map(|row| {
                row.and_then(|row| quad_from_row(&row))
                    .map_err(|e| StoreError::backend(BACKEND, e))
            })
            .boxed()
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
