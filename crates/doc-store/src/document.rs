use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{DocumentId, Result};

/// Version number of a stored document, used for optimistic concurrency control.
///
/// A document is stored at version 1 and every successful update increments
/// the version by one. Version 0 denotes "not yet stored".
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a new version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the initial version (0) of a document that was never stored.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Returns the version (1) a document receives on insert.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw version value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Version> for i64 {
    fn from(version: Version) -> Self {
        version.0
    }
}

/// A JSON document together with its storage metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Primary key, unique within the collection.
    pub id: DocumentId,

    /// Name of the collection the document belongs to (e.g. "users").
    pub collection: String,

    /// Current stored version.
    pub version: Version,

    /// The document body.
    pub body: serde_json::Value,

    /// When the document was first stored.
    pub created_at: DateTime<Utc>,

    /// When the document was last written.
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Creates an unsaved document from a raw JSON body.
    pub fn new(
        collection: impl Into<String>,
        id: impl Into<DocumentId>,
        body: serde_json::Value,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            collection: collection.into(),
            version: Version::initial(),
            body,
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates an unsaved document by serializing `value` as its body.
    pub fn from_value<T: Serialize>(
        collection: impl Into<String>,
        id: impl Into<DocumentId>,
        value: &T,
    ) -> Result<Self> {
        Ok(Self::new(collection, id, serde_json::to_value(value)?))
    }

    /// Replaces the body with the serialization of `value`, keeping metadata.
    pub fn with_value<T: Serialize>(mut self, value: &T) -> Result<Self> {
        self.body = serde_json::to_value(value)?;
        Ok(self)
    }

    /// Deserializes the body into `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.body.clone())?)
    }

    /// Returns a body field by name, if present.
    pub fn field(&self, name: &str) -> Option<&serde_json::Value> {
        self.body.get(name)
    }
}
