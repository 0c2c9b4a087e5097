//! Plan list controller: a fetch-once cache plus two-phase-commit mutations.
//!
//! Every mutation follows the same shape: apply the change to the local cache
//! immediately, persist it through the repository, and on persistence failure
//! reconcile the cache by re-querying the store. Local and remote state are
//! never allowed to diverge silently — a failed reconcile keeps the stale
//! cache and logs it.

use crate::list_view::ListView;
use crate::repository::{PlanOrder, PlanRepository};
use crate::store::{RowStore, StoreError};
use crate::types::{ActionPlan, ExtractedTask, PlanPatch, PlanStatus};

pub struct PlanListController<S: RowStore> {
    repo: PlanRepository<S>,
    view: ListView<ActionPlan>,
    order: PlanOrder,
}

impl<S: RowStore> PlanListController<S> {
    pub fn new(repo: PlanRepository<S>) -> Self {
        Self {
            repo,
            view: ListView::new(),
            order: PlanOrder::DateTimeDesc,
        }
    }

    pub fn view(&self) -> &ListView<ActionPlan> {
        &self.view
    }

    /// Search, filters, sorting, and paging all go through the view.
    pub fn view_mut(&mut self) -> &mut ListView<ActionPlan> {
        &mut self.view
    }

    /// Fetch the full record set and replace the cache.
    pub async fn load(&mut self) -> Result<(), StoreError> {
        let plans = self.repo.list(self.order).await?;
        self.view.set_records(plans);
        Ok(())
    }

    /// Create a plan from a manual form entry and surface it at the top of
    /// the cache (the store orders newest-first on the next load anyway).
    pub async fn create(&mut self, task: &ExtractedTask) -> Result<ActionPlan, StoreError> {
        let plan = self.repo.create(task).await?;
        let inserted = plan.clone();
        self.view.update_records(|rows| rows.insert(0, inserted));
        Ok(plan)
    }

    /// Inline edit: apply locally, persist, reconcile on failure.
    pub async fn edit(&mut self, id: &str, patch: PlanPatch) -> Result<(), StoreError> {
        self.view.update_records(|rows| {
            if let Some(row) = rows.iter_mut().find(|r| r.id == id) {
                patch.apply_to(row);
            }
        });

        match self.repo.update(id, &patch).await {
            Ok(saved) => {
                // Adopt the stored row — the store may have normalized values.
                self.view.update_records(|rows| {
                    if let Some(row) = rows.iter_mut().find(|r| r.id == id) {
                        *row = saved;
                    }
                });
                Ok(())
            }
            Err(err) => {
                log::warn!("edit of plan {} failed: {}", id, err.notification());
                self.reconcile().await;
                Err(err)
            }
        }
    }

    /// Status changes are just one-field edits.
    pub async fn set_status(&mut self, id: &str, status: PlanStatus) -> Result<(), StoreError> {
        self.edit(id, PlanPatch::status(status)).await
    }

    /// Delete: drop locally, persist, reconcile on failure.
    pub async fn delete(&mut self, id: &str) -> Result<(), StoreError> {
        self.view.update_records(|rows| rows.retain(|r| r.id != id));

        match self.repo.delete(id).await {
            Ok(()) => Ok(()),
            Err(err) => {
                log::warn!("delete of plan {} failed: {}", id, err.notification());
                self.reconcile().await;
                Err(err)
            }
        }
    }

    /// Re-query the store after a failed mutation. If the re-query itself
    /// fails the stale cache stays, which beats showing an empty table.
    async fn reconcile(&mut self) {
        match self.repo.list(self.order).await {
            Ok(plans) => self.view.set_records(plans),
            Err(err) => {
                log::warn!(
                    "reconcile re-query failed, keeping stale cache: {}",
                    err.notification()
                );
            }
        }
    }
}
