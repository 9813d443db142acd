use serde_json::Value;

/// Per-request accumulator for streamed bindings.
///
/// Each request gets its own session, so nothing collated here is visible to
/// any other request.
#[derive(Debug, Default)]
pub struct Session {
    collated: Vec<Value>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one streamed item into the aggregate.
    pub fn collate(&mut self, item: Value) {
        self.collated.push(item);
    }

    pub fn len(&self) -> usize {
        self.collated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collated.is_empty()
    }

    /// The aggregated result: an array of bindings in arrival order.
    pub fn results(self) -> Value {
        Value::Array(self.collated)
    }
}
