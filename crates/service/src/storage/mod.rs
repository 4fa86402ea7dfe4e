//! Storage abstractions for service layer
//!
//! `DocumentStore` is the narrow view of a hierarchical JSON database the
//! services need: whole-record reads and writes addressed by slash-separated
//! paths, an atomic create-if-absent, and an equality query on a child field.

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

pub mod firebase;
pub mod firebase_auth;
pub mod local_store;

pub use firebase::FirebaseStore;
pub use local_store::LocalStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("network error: {0}")]
    Network(String),
    #[error("store responded {status}: {body}")]
    Status { status: u16, body: String },
    #[error("decode error: {0}")]
    Decode(String),
    #[error("auth error: {0}")]
    Auth(String),
    #[error("io error: {0}")]
    Io(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            StoreError::Decode(e.to_string())
        } else {
            StoreError::Network(e.to_string())
        }
    }
}

/// Hierarchical key-value document store.
///
/// Writing `null` is equivalent to deleting, and reads of missing or `null`
/// locations return `None`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn read(&self, path: &str) -> Result<Option<Value>, StoreError>;

    /// Replace whatever is stored at `path`.
    async fn write(&self, path: &str, value: &Value) -> Result<(), StoreError>;

    /// Write only if nothing is stored at `path`; returns whether the write happened.
    async fn create(&self, path: &str, value: &Value) -> Result<bool, StoreError>;

    async fn delete(&self, path: &str) -> Result<(), StoreError>;

    /// Children of `collection` whose `field` equals the string `value`, keyed by child id.
    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Map<String, Value>, StoreError>;

    /// Short backend name for logs.
    fn backend(&self) -> &'static str;
}

/// Join a collection and a record id into a store path.
pub fn child_path(collection: &str, id: &str) -> String {
    format!("{collection}/{id}")
}

/// Split a path into its non-empty segments.
pub(crate) fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Children whose `field` is the string `value`, the way an equality query matches.
pub(crate) fn matching_children(children: &Map<String, Value>, field: &str, value: &str) -> Map<String, Value> {
    children
        .iter()
        .filter(|(_, child)| child.get(field).and_then(Value::as_str) == Some(value))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}
