//! The hosted row-storage collaborator.
//!
//! Tables are reached over a PostgREST-style HTTP surface; rows travel as raw
//! JSON objects keyed by column name. The repositories own the translation
//! between application field names and columns — this layer only moves rows.

pub mod rest;

#[cfg(test)]
pub(crate) mod memory;

pub use rest::RestStore;

use async_trait::async_trait;
use serde_json::Value;

/// Errors from row-storage operations. `Api` carries the backend's own
/// code/message/hint so callers can surface something actionable.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),
    #[error("store rejected the request: {message}")]
    Api {
        code: Option<String>,
        message: String,
        hint: Option<String>,
        details: Option<String>,
    },
    #[error("row not found")]
    NotFound,
    #[error("could not decode store row: {0}")]
    Decode(String),
}

impl StoreError {
    /// One-line human-readable text for a notification.
    pub fn notification(&self) -> String {
        match self {
            Self::Api {
                message,
                hint: Some(hint),
                ..
            } => format!("{} ({})", message, hint),
            other => other.to_string(),
        }
    }
}

/// Row-level access to the backing store. One call per row — there is no
/// batch or transactional surface, and callers must not assume one.
#[async_trait]
pub trait RowStore: Send + Sync {
    /// Fetch all visible rows of `table`, optionally ordered by a
    /// `column.asc` / `column.desc` pair.
    async fn select(&self, table: &str, order: Option<&str>) -> Result<Vec<Value>, StoreError>;

    /// Fetch a single row by primary key.
    async fn select_by_id(&self, table: &str, id: &str) -> Result<Option<Value>, StoreError>;

    /// Insert one row; returns the stored row (with its assigned id).
    async fn insert(&self, table: &str, row: Value) -> Result<Value, StoreError>;

    /// Patch the named columns of one row; returns the updated row.
    async fn update(&self, table: &str, id: &str, patch: Value) -> Result<Value, StoreError>;

    /// Delete one row.
    async fn delete(&self, table: &str, id: &str) -> Result<(), StoreError>;
}
