use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::query::parser::{parse, ParseOutcome, Traversal};
use crate::query::session::Session;
use crate::query::QueryError;
use crate::store::StoreHandle;

/// Capacity of the channel between the executing task and the collator.
pub const CHANNEL_CAPACITY: usize = 5;
/// Most items a single query may produce.
pub const RESULT_LIMIT: usize = 100;

/// Aborts the wrapped task when dropped, so a timed-out or abandoned request
/// does not leave its producer running.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Parses, executes and collates traversal queries against one store.
#[derive(Clone)]
pub struct QueryGateway {
    store: StoreHandle,
    timeout: Duration,
}

impl QueryGateway {
    pub fn new(store: StoreHandle, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Run a query to completion and return the collated result.
    pub async fn run(&self, text: &str) -> Result<Value, QueryError> {
        match parse(text) {
            ParseOutcome::Parsed(traversal) => self.execute(traversal).await,
            ParseOutcome::ParseFail(message) => Err(QueryError::Parse(message)),
            ParseOutcome::Incomplete => Err(QueryError::Incomplete),
        }
    }

    async fn execute(&self, traversal: Traversal) -> Result<Value, QueryError> {
        let (tx, mut rx) = mpsc::channel(CHANNEL_CAPACITY);
        let store = Arc::clone(&self.store);
        let mut producer = AbortOnDrop(tokio::spawn(async move {
            let plan = traversal.compile()?;
            plan.execute(store.as_ref(), &tx, RESULT_LIMIT).await
        }));

        let mut session = Session::new();
        let drained = tokio::time::timeout(self.timeout, async {
            while let Some(item) = rx.recv().await {
                session.collate(item);
            }
            (&mut producer.0).await
        })
        .await;

        match drained {
            Ok(Ok(Ok(sent))) => {
                log::debug!("Query produced {} items", sent);
                Ok(session.results())
            }
            // Anything collated so far is dropped with the session.
            Ok(Ok(Err(err))) => Err(err),
            Ok(Err(join)) => Err(QueryError::Execution(format!("query task failed: {join}"))),
            Err(_) => {
                log::warn!("Query timed out after {:?}", self.timeout);
                Err(QueryError::Timeout(self.timeout))
            }
        }
    }
}
