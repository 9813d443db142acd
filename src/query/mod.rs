pub mod gateway;
pub mod parser;
pub mod session;
pub mod traversal;

pub use gateway::*;
pub use parser::{parse, Arg, Call, ParseOutcome, Traversal};
pub use session::*;
pub use traversal::{Plan, Start, Step};

use std::time::Duration;

use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("Failed to parse query: {0}")]
    Parse(String),

    #[error("Query execution failed: {0}")]
    Execution(String),

    #[error("Possibly incomplete data or query?")]
    Incomplete,

    #[error("Query did not finish within {0:?}")]
    Timeout(Duration),
}

impl From<StoreError> for QueryError {
    fn from(err: StoreError) -> Self {
        QueryError::Execution(err.to_string())
    }
}
