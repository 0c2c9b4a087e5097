//! Action-plan repository over the `action_plans` table.
//!
//! Owns the fixed bidirectional mapping between application field names and
//! store columns (`dateTime ↔ date_time`, `startDate ↔ start_date`, ...).
//! Values read back from the store are re-normalized, never trusted — in
//! particular `status` always folds onto the canonical set.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::{json, Value};

use crate::store::{RowStore, StoreError};
use crate::types::{ActionPlan, ExtractedTask, PlanPatch, PlanStatus, UNSPECIFIED};

pub const ACTION_PLANS_TABLE: &str = "action_plans";

/// Server-side ordering for [`PlanRepository::list`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlanOrder {
    #[default]
    DateTimeDesc,
    DateTimeAsc,
    CreatedAtDesc,
}

impl PlanOrder {
    fn as_store_order(&self) -> &'static str {
        match self {
            Self::DateTimeDesc => "date_time.desc",
            Self::DateTimeAsc => "date_time.asc",
            Self::CreatedAtDesc => "created_at.desc",
        }
    }
}

pub struct PlanRepository<S: RowStore> {
    store: Arc<S>,
}

impl<S: RowStore> PlanRepository<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Fetch every visible plan, ordered server-side.
    pub async fn list(&self, order: PlanOrder) -> Result<Vec<ActionPlan>, StoreError> {
        let rows = self
            .store
            .select(ACTION_PLANS_TABLE, Some(order.as_store_order()))
            .await?;
        rows.iter().map(plan_from_row).collect()
    }

    /// Fetch one plan by id.
    pub async fn get(&self, id: &str) -> Result<Option<ActionPlan>, StoreError> {
        match self.store.select_by_id(ACTION_PLANS_TABLE, id).await? {
            Some(row) => plan_from_row(&row).map(Some),
            None => Ok(None),
        }
    }

    /// Persist one candidate; the store assigns the id.
    pub async fn create(&self, task: &ExtractedTask) -> Result<ActionPlan, StoreError> {
        let row = self
            .store
            .insert(ACTION_PLANS_TABLE, task_to_row(task))
            .await?;
        plan_from_row(&row)
    }

    /// Patch the named fields of one plan and return the stored result.
    pub async fn update(&self, id: &str, patch: &PlanPatch) -> Result<ActionPlan, StoreError> {
        if patch.is_empty() {
            return self.get(id).await?.ok_or(StoreError::NotFound);
        }
        let row = self
            .store
            .update(ACTION_PLANS_TABLE, id, patch_to_row(patch))
            .await?;
        plan_from_row(&row)
    }

    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.store.delete(ACTION_PLANS_TABLE, id).await
    }
}

// ---------------------------------------------------------------------------
// Field ↔ column mapping
// ---------------------------------------------------------------------------

// `id`, `user_id`, and `created_at` are store-assigned columns and never
// travel outbound.
fn task_to_row(task: &ExtractedTask) -> Value {
    json!({
        "date_time": task.date_time.to_rfc3339(),
        "department": task.department,
        "responsible": task.responsible,
        "action": task.action,
        "solution": task.solution,
        "start_date": task.start_date.to_string(),
        "end_date": task.end_date.to_string(),
        "investment": task.investment,
        "status": task.status.as_str(),
        "notes": task.notes,
    })
}

fn patch_to_row(patch: &PlanPatch) -> Value {
    let mut row = serde_json::Map::new();
    if let Some(v) = patch.date_time {
        row.insert("date_time".to_string(), json!(v.to_rfc3339()));
    }
    if let Some(ref v) = patch.department {
        row.insert("department".to_string(), json!(v));
    }
    if let Some(ref v) = patch.responsible {
        row.insert("responsible".to_string(), json!(v));
    }
    if let Some(ref v) = patch.action {
        row.insert("action".to_string(), json!(v));
    }
    if let Some(ref v) = patch.solution {
        row.insert("solution".to_string(), json!(v));
    }
    if let Some(v) = patch.start_date {
        row.insert("start_date".to_string(), json!(v.to_string()));
    }
    if let Some(v) = patch.end_date {
        row.insert("end_date".to_string(), json!(v.to_string()));
    }
    if let Some(ref v) = patch.investment {
        row.insert("investment".to_string(), json!(v));
    }
    if let Some(v) = patch.status {
        row.insert("status".to_string(), json!(v.as_str()));
    }
    if patch.clear_notes {
        row.insert("notes".to_string(), Value::Null);
    } else if let Some(ref v) = patch.notes {
        row.insert("notes".to_string(), json!(v));
    }
    Value::Object(row)
}

fn plan_from_row(row: &Value) -> Result<ActionPlan, StoreError> {
    let id = match &row["id"] {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return Err(StoreError::Decode("row is missing an id".to_string())),
    };

    let date_time = row["date_time"]
        .as_str()
        .and_then(parse_row_timestamp)
        .ok_or_else(|| StoreError::Decode(format!("bad date_time on row {}", id)))?;

    let start_date = parse_row_date(&row["start_date"])
        .ok_or_else(|| StoreError::Decode(format!("bad start_date on row {}", id)))?;
    let end_date = parse_row_date(&row["end_date"])
        .ok_or_else(|| StoreError::Decode(format!("bad end_date on row {}", id)))?;

    Ok(ActionPlan {
        id,
        date_time,
        department: required_column(&row["department"]),
        responsible: required_column(&row["responsible"]),
        action: required_column(&row["action"]),
        solution: required_column(&row["solution"]),
        start_date,
        end_date,
        investment: required_column(&row["investment"]),
        status: PlanStatus::normalize(row["status"].as_str().unwrap_or("")),
        notes: row["notes"]
            .as_str()
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.to_string()),
    })
}

/// Required columns never surface blank — a null or empty cell becomes the
/// sentinel, same as on the extraction side.
fn required_column(value: &Value) -> String {
    match value.as_str() {
        Some(s) if !s.trim().is_empty() => s.to_string(),
        _ => UNSPECIFIED.to_string(),
    }
}

/// Timestamps come back RFC 3339, with or without an explicit offset
/// depending on the column type.
fn parse_row_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn parse_row_date(value: &Value) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.as_str()?, "%Y-%m-%d").ok()
}
