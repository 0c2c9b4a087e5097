//! In-memory list view logic: free-text search, per-column filters,
//! tri-state sorting, and fixed-size pagination.
//!
//! The pipeline is always filter → sort → paginate over a pristine cached
//! record set. Sorting is a stable reorder of the filtered copy, so cycling a
//! column back to unsorted restores the original fetch order exactly.

use std::collections::HashMap;
use std::hash::Hash;

use crate::types::{ActionPlan, UserRecord};

/// Rows per page.
pub const PAGE_SIZE: usize = 50;

/// A record that can live in a table view: a fixed set of named columns,
/// each rendering to a string cell.
pub trait ListRecord: Clone {
    type Column: Copy + Eq + Hash + std::fmt::Debug + 'static;

    /// All columns, in table order.
    const COLUMNS: &'static [Self::Column];

    /// String form of one cell. Search and filters match against these.
    fn cell(&self, column: Self::Column) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

pub struct ListView<R: ListRecord> {
    records: Vec<R>,
    search: String,
    filters: HashMap<R::Column, String>,
    sort: Option<(R::Column, SortDirection)>,
    page: usize,
    page_size: usize,
}

impl<R: ListRecord> Default for ListView<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: ListRecord> ListView<R> {
    pub fn new() -> Self {
        Self::with_page_size(PAGE_SIZE)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            records: Vec::new(),
            search: String::new(),
            filters: HashMap::new(),
            sort: None,
            page: 1,
            page_size: page_size.max(1),
        }
    }

    /// Replace the cached record set (after a fetch or a reconcile re-query).
    /// Search, filters, sort, and page all survive the swap.
    pub fn set_records(&mut self, records: Vec<R>) {
        self.records = records;
    }

    /// The pristine cache, in fetch order.
    pub fn records(&self) -> &[R] {
        &self.records
    }

    /// Mutate the cached records in place (optimistic local updates).
    pub fn update_records(&mut self, f: impl FnOnce(&mut Vec<R>)) {
        f(&mut self.records);
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.search = term.into();
    }

    /// Set a per-column filter; an empty needle clears it.
    pub fn set_filter(&mut self, column: R::Column, needle: impl Into<String>) {
        let needle = needle.into();
        if needle.trim().is_empty() {
            self.filters.remove(&column);
        } else {
            self.filters.insert(column, needle);
        }
    }

    pub fn clear_filter(&mut self, column: R::Column) {
        self.filters.remove(&column);
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear();
    }

    /// Cycle the sort state for a column: none → ascending → descending →
    /// none. Activating a different column restarts at ascending there.
    pub fn toggle_sort(&mut self, column: R::Column) {
        self.sort = match self.sort {
            Some((current, SortDirection::Ascending)) if current == column => {
                Some((column, SortDirection::Descending))
            }
            Some((current, SortDirection::Descending)) if current == column => None,
            _ => Some((column, SortDirection::Ascending)),
        };
    }

    pub fn sort_state(&self) -> Option<(R::Column, SortDirection)> {
        self.sort
    }

    /// Requested 1-based page. The visible slice clamps to the last
    /// non-empty page when filters shrink the set.
    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn total_pages(&self) -> usize {
        self.filtered().len().div_ceil(self.page_size)
    }

    /// Filtered and sorted rows, before pagination.
    pub fn filtered(&self) -> Vec<R> {
        let search = self.search.trim().to_lowercase();

        let mut rows: Vec<R> = self
            .records
            .iter()
            .filter(|record| {
                Self::matches_search(record, &search) && self.matches_filters(record)
            })
            .cloned()
            .collect();

        if let Some((column, direction)) = self.sort {
            // Stable sort: equal cells keep fetch order.
            rows.sort_by(|a, b| {
                let ordering = a.cell(column).cmp(&b.cell(column));
                match direction {
                    SortDirection::Ascending => ordering,
                    SortDirection::Descending => ordering.reverse(),
                }
            });
        }

        rows
    }

    /// The current page of the filtered, sorted set.
    pub fn visible(&self) -> Vec<R> {
        let rows = self.filtered();
        let total_pages = rows.len().div_ceil(self.page_size);
        if total_pages == 0 {
            return Vec::new();
        }

        let page = self.page.min(total_pages);
        rows.into_iter()
            .skip((page - 1) * self.page_size)
            .take(self.page_size)
            .collect()
    }

    /// Free-text search: substring match against the string form of any
    /// column, case-insensitive. An empty term matches everything.
    fn matches_search(record: &R, search: &str) -> bool {
        if search.is_empty() {
            return true;
        }
        R::COLUMNS
            .iter()
            .any(|&column| record.cell(column).to_lowercase().contains(search))
    }

    /// Column filters AND together, each a case-insensitive substring match.
    fn matches_filters(&self, record: &R) -> bool {
        self.filters.iter().all(|(&column, needle)| {
            record
                .cell(column)
                .to_lowercase()
                .contains(&needle.trim().to_lowercase())
        })
    }
}

// ---------------------------------------------------------------------------
// Column definitions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlanColumn {
    Id,
    DateTime,
    Department,
    Responsible,
    Action,
    Solution,
    StartDate,
    EndDate,
    Investment,
    Status,
    Notes,
}

impl ListRecord for ActionPlan {
    type Column = PlanColumn;

    const COLUMNS: &'static [PlanColumn] = &[
        PlanColumn::Id,
        PlanColumn::DateTime,
        PlanColumn::Department,
        PlanColumn::Responsible,
        PlanColumn::Action,
        PlanColumn::Solution,
        PlanColumn::StartDate,
        PlanColumn::EndDate,
        PlanColumn::Investment,
        PlanColumn::Status,
        PlanColumn::Notes,
    ];

    fn cell(&self, column: PlanColumn) -> String {
        match column {
            PlanColumn::Id => self.id.clone(),
            PlanColumn::DateTime => self.date_time.format("%Y-%m-%d %H:%M").to_string(),
            PlanColumn::Department => self.department.clone(),
            PlanColumn::Responsible => self.responsible.clone(),
            PlanColumn::Action => self.action.clone(),
            PlanColumn::Solution => self.solution.clone(),
            PlanColumn::StartDate => self.start_date.to_string(),
            PlanColumn::EndDate => self.end_date.to_string(),
            PlanColumn::Investment => self.investment.clone(),
            PlanColumn::Status => self.status.as_str().to_string(),
            PlanColumn::Notes => self.notes.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserColumn {
    Id,
    Name,
    Email,
    Department,
    Role,
    Status,
}

impl ListRecord for UserRecord {
    type Column = UserColumn;

    const COLUMNS: &'static [UserColumn] = &[
        UserColumn::Id,
        UserColumn::Name,
        UserColumn::Email,
        UserColumn::Department,
        UserColumn::Role,
        UserColumn::Status,
    ];

    fn cell(&self, column: UserColumn) -> String {
        match column {
            UserColumn::Id => self.id.clone(),
            UserColumn::Name => self.name.clone(),
            UserColumn::Email => self.email.clone().unwrap_or_default(),
            UserColumn::Department => self.department.clone().unwrap_or_default(),
            UserColumn::Role => self.role.clone().unwrap_or_default(),
            UserColumn::Status => self
                .status
                .map(|s| s.as_str().to_string())
                .unwrap_or_default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
