pub mod memory;
pub mod mongo;
pub mod postgres;
pub mod traits;

pub use memory::*;
pub use mongo::*;
pub use postgres::*;
pub use traits::*;

use futures::TryStreamExt;
use std::io::Write;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::GatewayConfig;

/// Shared, read-only handle to the open store.
pub type StoreHandle = Arc<dyn QuadStore>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Memory,
    Postgres,
    Mongo,
}

impl FromStr for Backend {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(Backend::Memory),
            "postgres" | "postgresql" => Ok(Backend::Postgres),
            "mongo" | "mongodb" => Ok(Backend::Mongo),
            _ => Err(StoreError::UnsupportedBackend(s.to_string())),
        }
    }
}

/// Idempotently create whatever structures the backend needs.
pub async fn init(config: &GatewayConfig) -> Result<(), StoreError> {
    let path = &config.database_path;
    match config.database_type.parse()? {
        Backend::Memory => MemoryStore::init(path)?,
        Backend::Postgres => {
            let store = PostgresStore::new(path, config.timeout).await?;
            store.migrate().await?;
            store.close().await;
        }
        Backend::Mongo => {
            let store = MongoStore::connect(path, config.timeout).await?;
            store.migrate().await?;
            store.close().await;
        }
    }
    log::info!("Initialized {} store at {}", config.database_type, path);
    Ok(())
}

/// Open a live handle for serving or dumping.
pub async fn open(config: &GatewayConfig) -> Result<StoreHandle, StoreError> {
    let path = &config.database_path;
    let handle: StoreHandle = match config.database_type.parse()? {
        Backend::Memory => Arc::new(MemoryStore::open(path)?),
        Backend::Postgres => Arc::new(PostgresStore::new(path, config.timeout).await?),
        Backend::Mongo => Arc::new(MongoStore::connect(path, config.timeout).await?),
    };
    log::info!("Opened {} store", handle.backend());
    Ok(handle)
}

/// Print every stored quad as one JSON object per line, preceded by a count.
/// Returns the number of records written.
pub async fn dump<W: Write>(store: &dyn QuadStore, out: &mut W) -> anyhow::Result<u64> {
    let count = store.quad_count().await?;
    writeln!(out, "Found {} results:", count)?;

    let mut written = 0;
    let mut quads = store.scan();
    while let Some(quad) = quads.try_next().await? {
        writeln!(out, "{}", serde_json::to_string(&quad)?)?;
        written += 1;
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Quad;

    #[test]
    fn backend_names() {
        assert_eq!("memory".parse::<Backend>().unwrap(), Backend::Memory);
        assert_eq!("PostgreSQL".parse::<Backend>().unwrap(), Backend::Postgres);
        assert_eq!("mongo".parse::<Backend>().unwrap(), Backend::Mongo);
        assert!(matches!(
            "bolt".parse::<Backend>(),
            Err(StoreError::UnsupportedBackend(_))
        ));
    }

    #[tokio::test]
    async fn open_rejects_unknown_backend() {
        let config = GatewayConfig {
            database_type: "leveldb".to_string(),
            ..GatewayConfig::default()
        };
        assert!(matches!(
            open(&config).await,
            Err(StoreError::UnsupportedBackend(_))
        ));
    }

    #[tokio::test]
    async fn init_then_open_memory_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let config = GatewayConfig {
            database_type: "memory".to_string(),
            database_path: dir.path().join("quads.nq").to_str().unwrap().to_string(),
            ..GatewayConfig::default()
        };

        assert!(open(&config).await.is_err());
        init(&config).await.unwrap();
        init(&config).await.unwrap();
        let store = open(&config).await.unwrap();
        assert_eq!(store.backend(), "memory");
        assert_eq!(store.quad_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn dump_prints_count_and_records() {
        let store = MemoryStore::from_quads([
            Quad::new("/properties/1", "/name", "a"),
            Quad::new("/properties/2", "/name", "b"),
        ]);
        let mut out = Vec::new();
        let written = dump(&store, &mut out).await.unwrap();
        assert_eq!(written, 2);

        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("Found 2 results:"));
        let first: Quad = serde_json::from_str(lines.next().unwrap()).unwrap();
        assert_eq!(first, Quad::new("/properties/1", "/name", "a"));
        assert_eq!(lines.count(), 1);
    }
}
