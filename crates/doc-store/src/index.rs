use serde_json::Value;

use crate::{Result, StoreError};

/// A unique constraint over one or more top-level body fields of a collection.
///
/// Documents lacking any of the fields (or holding `null`) are not indexed,
/// mirroring a partial index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniqueIndex {
    pub collection: &'static str,
    pub fields: &'static [&'static str],
}

impl UniqueIndex {
    /// Declares a unique index.
    pub const fn new(collection: &'static str, fields: &'static [&'static str]) -> Self {
        Self { collection, fields }
    }

    /// Returns the index name used by storage backends.
    pub fn name(&self) -> String {
        format!("uq_{}_{}", self.collection, self.fields.join("_")).to_lowercase()
    }

    /// Extracts the key tuple for `body`, or `None` if the document is not indexed.
    pub fn key(&self, body: &Value) -> Option<Vec<Value>> {
        self.fields
            .iter()
            .map(|field| match body.get(field) {
                None | Some(Value::Null) => None,
                Some(value) => Some(value.clone()),
            })
            .collect()
    }

    /// Checks that the collection and field names are plain identifiers.
    ///
    /// Index DDL cannot bind parameters, so names are spliced into SQL and
    /// must be restricted to `[A-Za-z0-9_]`.
    pub fn validate(&self) -> Result<()> {
        if self.fields.is_empty() {
            return Err(StoreError::InvalidIndex(format!(
                "index on {} has no fields",
                self.collection
            )));
        }
        let is_ident = |s: &str| {
            !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        };
        if !is_ident(self.collection) {
            return Err(StoreError::InvalidIndex(format!(
                "invalid collection name {:?}",
                self.collection
            )));
        }
        if let Some(bad) = self.fields.iter().find(|f| !is_ident(f)) {
            return Err(StoreError::InvalidIndex(format!("invalid field name {bad:?}")));
        }
        Ok(())
    }
}
