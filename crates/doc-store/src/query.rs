use serde_json::Value;

/// Builder for field-equality queries over one collection.
///
/// Every filter must match (logical AND). Results come back in insertion order.
#[derive(Debug, Clone, Default)]
pub struct DocumentQuery {
    /// Collection to search.
    pub collection: String,

    /// Top-level body fields that must equal the given values.
    pub filters: Vec<(String, Value)>,

    /// Maximum number of documents to return.
    pub limit: Option<usize>,

    /// Number of documents to skip.
    pub offset: Option<usize>,
}

impl DocumentQuery {
    /// Creates a query matching every document of a collection.
    pub fn collection(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            ..Default::default()
        }
    }

    /// Requires `field` to equal `value`.
    pub fn filter(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    /// Limits the number of results.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips the first `offset` results.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns true if `body` satisfies every filter.
    pub fn matches(&self, body: &Value) -> bool {
        self.filters
            .iter()
            .all(|(field, value)| body.get(field) == Some(value))
    }

    /// Builds the JSON object used for containment matching (`body @> filter`).
    pub fn filter_object(&self) -> Value {
        let map = self
            .filters
            .iter()
            .map(|(field, value)| (field.clone(), value.clone()))
            .collect::<serde_json::Map<_, _>>();
        Value::Object(map)
    }
}
