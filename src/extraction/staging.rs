//! Review/edit staging for extracted tasks.
//!
//! Staged rows live only in memory and are never the source of truth:
//! persistence happens exclusively through [`StagingStore::confirm_all`],
//! which writes one row at a time through the plan repository. There is no
//! batch API underneath — a failure mid-loop leaves the earlier rows
//! committed, and the report says so.

use parking_lot::Mutex;

use crate::repository::PlanRepository;
use crate::store::{RowStore, StoreError};
use crate::types::{ActionPlan, ExtractedTask};

/// The sequential confirm stopped at `failed_index`. Rows before it are
/// already committed; staging still holds every row so the user can retry.
#[derive(Debug, thiserror::Error)]
#[error("{} staged record(s) saved before record {} failed: {}", .saved.len(), .failed_index, .source)]
pub struct ConfirmError {
    /// Plans written before the failure (committed, not rolled back).
    pub saved: Vec<ActionPlan>,
    /// Zero-based index of the staged row that failed.
    pub failed_index: usize,
    #[source]
    pub source: StoreError,
}

/// In-memory holding area for validated-but-unpersisted tasks.
#[derive(Default)]
pub struct StagingStore {
    rows: Mutex<Vec<ExtractedTask>>,
}

impl StagingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the staged set after a new extraction run.
    pub fn replace_all(&self, tasks: Vec<ExtractedTask>) {
        *self.rows.lock() = tasks;
    }

    /// Drop one staged row. Out-of-range indexes are a logged no-op.
    pub fn remove_at(&self, index: usize) {
        let mut rows = self.rows.lock();
        if index < rows.len() {
            rows.remove(index);
        } else {
            log::warn!(
                "ignoring removal of staged row {} (only {} staged)",
                index,
                rows.len()
            );
        }
    }

    pub fn clear(&self) {
        self.rows.lock().clear();
    }

    pub fn snapshot(&self) -> Vec<ExtractedTask> {
        self.rows.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.lock().is_empty()
    }

    /// Persist every staged row, one create per row, stopping at the first
    /// failure. On full success staging is cleared and the created plans are
    /// returned; on failure staging is left intact for retry.
    pub async fn confirm_all<S: RowStore>(
        &self,
        repo: &PlanRepository<S>,
    ) -> Result<Vec<ActionPlan>, ConfirmError> {
        let staged = self.snapshot();
        let mut saved = Vec::with_capacity(staged.len());

        for (index, task) in staged.iter().enumerate() {
            match repo.create(task).await {
                Ok(plan) => saved.push(plan),
                Err(source) => {
                    log::warn!(
                        "confirm stopped at staged row {}: {}",
                        index,
                        source.notification()
                    );
                    return Err(ConfirmError {
                        saved,
                        failed_index: index,
                        source,
                    });
                }
            }
        }

        self.clear();
        Ok(saved)
    }
}
