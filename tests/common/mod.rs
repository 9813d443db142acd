#![allow(dead_code)]

use async_trait::async_trait;
use futures::stream::BoxStream;
use ogma_prime::model::{Direction, Quad};
use ogma_prime::store::{MemoryStore, QuadStore, StoreError, StoreHandle};
use reqwest::Client;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

// Test client wrapper for making API calls
pub struct TestClient {
    client: Client,
    base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    /// A client that gives up on requests after `timeout`.
    pub fn impatient(base_url: String, timeout: Duration) -> Self {
        Self {
            client: Client::builder().timeout(timeout).build().unwrap(),
            base_url,
        }
    }

    pub async fn get(&self, path: &str) -> reqwest::Result<reqwest::Response> {
        self.client
            .get(&format!("{}{}", self.base_url, path))
            .send()
            .await
    }

    pub async fn get_with_header(
        &self,
        path: &str,
        name: &str,
        value: &str,
    ) -> reqwest::Result<reqwest::Response> {
        self.client
            .get(&format!("{}{}", self.base_url, path))
            .header(name, value)
            .send()
            .await
    }

    pub async fn post(&self, path: &str) -> reqwest::Result<reqwest::Response> {
        self.client
            .post(&format!("{}{}", self.base_url, path))
            .send()
            .await
    }
}

/// A gateway running on an ephemeral port, stopped on `shutdown`.
pub struct TestServer {
    pub address: SocketAddr,
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<anyhow::Result<()>>,
}

impl TestServer {
    pub async fn start(quads: Vec<Quad>) -> Self {
        Self::with_store(Arc::new(MemoryStore::from_quads(quads))).await
    }

    pub async fn with_store(store: StoreHandle) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let (stop, stopped) = oneshot::channel::<()>();

        let task = tokio::spawn(ogma_prime::serve_on(
            listener,
            store,
            Duration::from_secs(5),
            async move {
                let _ = stopped.await;
            },
        ));

        Self {
            address,
            stop: Some(stop),
            task,
        }
    }

    pub fn client(&self) -> TestClient {
        TestClient::new(format!("http://{}", self.address))
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.address)
    }

    pub async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        self.task.await.unwrap().unwrap();
    }
}

pub fn property_quads() -> Vec<Quad> {
    vec![
        Quad::new("/properties/42", "/name", "x"),
        Quad::new("/properties/42", "/owner", "/people/7"),
        Quad::new("/properties/43", "/name", "y"),
        Quad::new("/people/7", "/name", "Ada"),
    ]
}

/// Memory store whose edge lookups stall for `delay`, counting the lookups
/// that ran to completion.
pub struct SlowStore {
    inner: MemoryStore,
    delay: Duration,
    pub finished_lookups: AtomicUsize,
}

impl SlowStore {
    pub fn new(quads: Vec<Quad>, delay: Duration) -> Self {
        Self {
            inner: MemoryStore::from_quads(quads),
            delay,
            finished_lookups: AtomicUsize::new(0),
        }
    }

    pub fn finished(&self) -> usize {
        self.finished_lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuadStore for SlowStore {
    fn backend(&self) -> &'static str {
        "slow"
    }

    async fn contains_vertex(&self, vertex: &str) -> Result<bool, StoreError> {
        self.inner.contains_vertex(vertex).await
    }

    async fn vertices(&self, limit: usize) -> Result<Vec<String>, StoreError> {
        self.inner.vertices(limit).await
    }

    async fn quads_at(&self, direction: Direction, vertex: &str) -> Result<Vec<Quad>, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.finished_lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.quads_at(direction, vertex).await
    }

    async fn quad_count(&self) -> Result<u64, StoreError> {
        self.inner.quad_count().await
    }

    fn scan(&self) -> BoxStream<'_, Result<Quad, StoreError>> {
        self.inner.scan()
    }
}

/// Parse the `{:?}` rendering of a `Duration` as written in access lines.
pub fn parse_logged_elapsed(field: &str) -> Option<Duration> {
    let split = field.find(|c: char| !(c.is_ascii_digit() || c == '.'))?;
    let (number, unit) = field.split_at(split);
    let value: f64 = number.parse().ok()?;
    let scale = match unit {
        "ns" => 1e-9,
        "µs" => 1e-6,
        "ms" => 1e-3,
        "s" => 1.0,
        _ => return None,
    };
    Some(Duration::from_secs_f64(value * scale))
}
