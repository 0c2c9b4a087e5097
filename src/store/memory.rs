//! In-memory [`RowStore`] for logic tests: HashMap tables, sequential ids,
//! and per-operation failure injection to exercise error paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use super::{RowStore, StoreError};

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    next_id: AtomicUsize,
    insert_calls: AtomicUsize,
    /// Fail the nth insert call (0-based) with a canned store error.
    fail_insert_at: Mutex<Option<usize>>,
    /// Fail every update call while set.
    fail_updates: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_insert_at(&self, call_index: usize) {
        *self.fail_insert_at.lock() = Some(call_index);
    }

    pub fn fail_updates(&self, enabled: bool) {
        *self.fail_updates.lock() = enabled;
    }

    /// Seed a table row directly, bypassing id assignment.
    pub fn seed(&self, table: &str, row: Value) {
        self.tables
            .lock()
            .entry(table.to_string())
            .or_default()
            .push(row);
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.tables.lock().get(table).map_or(0, |rows| rows.len())
    }

    fn injected_error(what: &str) -> StoreError {
        StoreError::Api {
            code: Some("XX000".to_string()),
            message: format!("injected {} failure", what),
            hint: None,
            details: None,
        }
    }
}

#[async_trait]
impl RowStore for MemoryStore {
    async fn select(&self, table: &str, order: Option<&str>) -> Result<Vec<Value>, StoreError> {
        let tables = self.tables.lock();
        let mut rows = tables.get(table).cloned().unwrap_or_default();

        if let Some(order) = order {
            let (column, descending) = match order.rsplit_once('.') {
                Some((col, "desc")) => (col, true),
                Some((col, _)) => (col, false),
                None => (order, false),
            };
            rows.sort_by(|a, b| {
                let left = a[column].as_str().unwrap_or_default().to_string();
                let right = b[column].as_str().unwrap_or_default().to_string();
                if descending {
                    right.cmp(&left)
                } else {
                    left.cmp(&right)
                }
            });
        }

        Ok(rows)
    }

    async fn select_by_id(&self, table: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let tables = self.tables.lock();
        Ok(tables
            .get(table)
            .and_then(|rows| rows.iter().find(|r| r["id"] == id).cloned()))
    }

    async fn insert(&self, table: &str, mut row: Value) -> Result<Value, StoreError> {
        let call = self.insert_calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail_insert_at.lock() == Some(call) {
            return Err(Self::injected_error("insert"));
        }

        if row.get("id").is_none() {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            row["id"] = Value::String(format!("row-{}", id));
        }

        self.tables
            .lock()
            .entry(table.to_string())
            .or_default()
            .push(row.clone());
        Ok(row)
    }

    async fn update(&self, table: &str, id: &str, patch: Value) -> Result<Value, StoreError> {
        if *self.fail_updates.lock() {
            return Err(Self::injected_error("update"));
        }

        let mut tables = self.tables.lock();
        let rows = tables.get_mut(table).ok_or(StoreError::NotFound)?;
        let row = rows
            .iter_mut()
            .find(|r| r["id"] == id)
            .ok_or(StoreError::NotFound)?;

        if let (Some(target), Some(fields)) = (row.as_object_mut(), patch.as_object()) {
            for (key, value) in fields {
                target.insert(key.clone(), value.clone());
            }
        }
        Ok(row.clone())
    }

    async fn delete(&self, table: &str, id: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.lock();
        let rows = tables.get_mut(table).ok_or(StoreError::NotFound)?;
        let before = rows.len();
        rows.retain(|r| r["id"] != id);
        if rows.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
