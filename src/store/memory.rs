use futures::stream::{self, BoxStream, StreamExt};
use itertools::Itertools;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::fs::OpenOptions;
use std::path::Path;

use crate::model::{Direction, Quad};
use crate::store::traits::{QuadStore, StoreError};

const BACKEND: &str = "memory";

#[derive(Debug, Default)]
struct Index {
    quads: Vec<Quad>,
    seen: HashSet<Quad>,
    by_subject: HashMap<String, Vec<usize>>,
    by_object: HashMap<String, Vec<usize>>,
}

impl Index {
    fn insert(&mut self, quad: Quad) -> bool {
        if !self.seen.insert(quad.clone()) {
            return false;
        }
        let position = self.quads.len();
        self.by_subject
            .entry(quad.subject.clone())
            .or_default()
            .push(position);
        self.by_object
            .entry(quad.object.clone())
            .or_default()
            .push(position);
        self.quads.push(quad);
        true
    }

    fn positions(&self, direction: Direction, vertex: &str) -> &[usize] {
        let map = match direction {
            Direction::Subject => &self.by_subject,
            Direction::Object => &self.by_object,
        };
        map.get(vertex).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// In-process quad set, optionally loaded from a dataset file.
#[derive(Debug, Default)]
pub struct MemoryStore {
    index: RwLock<Index>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_quads(quads: impl IntoIterator<Item = Quad>) -> Self {
        let store = Self::new();
        for quad in quads {
            store.insert(quad);
        }
        store
    }

    /// Add a quad; duplicates are ignored. Returns whether it was new.
    pub fn insert(&self, quad: Quad) -> bool {
        self.index.write().insert(quad)
    }

    /// Load a dataset file. An empty path gives an empty store.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        if path.is_empty() {
            return Ok(Self::new());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| StoreError::Connection {
            backend: BACKEND,
            path: path.to_string(),
            reason: e.to_string(),
        })?;

        let store = Self::new();
        for (number, line) in contents.lines().enumerate() {
            let parsed = Quad::parse_line(line).map_err(|reason| StoreError::Dataset {
                path: path.to_string(),
                line: number + 1,
                reason,
            })?;
            if let Some(quad) = parsed {
                store.insert(quad);
            }
        }

        log::info!("Loaded {} quads from {}", store.index.read().quads.len(), path);
        Ok(store)
    }

    /// Make sure the dataset file exists without touching its contents.
    pub fn init(path: &str) -> Result<(), StoreError> {
        if path.is_empty() {
            return Ok(());
        }
        if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Connection {
                backend: BACKEND,
                path: path.to_string(),
                reason: e.to_string(),
            })?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| StoreError::Connection {
                backend: BACKEND,
                path: path.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl QuadStore for MemoryStore {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    async fn contains_vertex(&self, vertex: &str) -> Result<bool, StoreError> {
        let index = self.index.read();
        Ok(index.by_subject.contains_key(vertex) || index.by_object.contains_key(vertex))
    }

    async fn vertices(&self, limit: usize) -> Result<Vec<String>, StoreError> {
        let index = self.index.read();
        Ok(index
            .quads
            .iter()
            .flat_map(|q| [&q.subject, &q.object])
            .unique()
            .take(limit)
            .cloned()
            .collect())
    }

    async fn quads_at(&self, direction: Direction, vertex: &str) -> Result<Vec<Quad>, StoreError> {
        let index = self.index.read();
        Ok(index
            .positions(direction, vertex)
            .iter()
            .map(|&i| index.quads[i].clone())
            .collect())
    }

    async fn quad_count(&self) -> Result<u64, StoreError> {
        Ok(self.index.read().quads.len() as u64)
    }

    fn scan(&self) -> BoxStream<'_, Result<Quad, StoreError>> {
        let snapshot = self.index.read().quads.clone();
        stream::iter(snapshot.into_iter().map(Ok)).boxed()
    }
}
