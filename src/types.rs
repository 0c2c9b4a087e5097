//! Core record types shared by the extraction pipeline, the repositories, and
//! the list views.
//!
//! Application-facing shapes serialize camelCase; the repository layer owns the
//! translation to the row store's snake_case columns.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Sentinel for required fields the extraction could not resolve. Required
/// columns never render blank; they render this.
pub const UNSPECIFIED: &str = "Não especificado";

// ---------------------------------------------------------------------------
// Plan status
// ---------------------------------------------------------------------------

/// Lifecycle status of an action plan. Always one of these three values —
/// anything else coming in from the model or the store is folded through
/// [`PlanStatus::normalize`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    #[default]
    Progress,
    Complete,
    Overdue,
}

impl PlanStatus {
    /// Fold a free-form status label onto the canonical set.
    ///
    /// Case-insensitive synonym table; unrecognized labels default to
    /// `Progress` rather than surviving as arbitrary strings.
    pub fn normalize(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "em andamento" | "a fazer" | "progress" => Self::Progress,
            "concluído" | "concluido" | "complete" => Self::Complete,
            "atrasado" | "overdue" => Self::Overdue,
            _ => Self::Progress,
        }
    }

    /// Canonical wire value ("progress" / "complete" / "overdue").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Progress => "progress",
            Self::Complete => "complete",
            Self::Overdue => "overdue",
        }
    }

    /// Display label for table cells.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Progress => "Em Andamento",
            Self::Complete => "Concluído",
            Self::Overdue => "Atrasado",
        }
    }
}

impl std::fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Action plans
// ---------------------------------------------------------------------------

/// A persisted action plan. `id` is assigned by the row store on creation and
/// immutable thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionPlan {
    pub id: String,
    /// When the plan was logged.
    pub date_time: DateTime<Utc>,
    pub department: String,
    pub responsible: String,
    pub action: String,
    pub solution: String,
    pub start_date: NaiveDate,
    /// Expected to be >= `start_date`; not enforced.
    pub end_date: NaiveDate,
    /// Free text — may carry a currency symbol or "N/A".
    pub investment: String,
    pub status: PlanStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A validated-but-unpersisted plan candidate: the unit of staging and of
/// creation. Same shape as [`ActionPlan`] minus the store-assigned `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedTask {
    pub date_time: DateTime<Utc>,
    pub department: String,
    pub responsible: String,
    pub action: String,
    pub solution: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub investment: String,
    pub status: PlanStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ExtractedTask {
    /// Attach a store-assigned id, producing a persisted plan.
    pub fn into_plan(self, id: String) -> ActionPlan {
        ActionPlan {
            id,
            date_time: self.date_time,
            department: self.department,
            responsible: self.responsible,
            action: self.action,
            solution: self.solution,
            start_date: self.start_date,
            end_date: self.end_date,
            investment: self.investment,
            status: self.status,
            notes: self.notes,
        }
    }
}

/// Per-field patch for inline edits. Unset fields are left untouched;
/// `clear_notes` removes the annotation entirely.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanPatch {
    pub date_time: Option<DateTime<Utc>>,
    pub department: Option<String>,
    pub responsible: Option<String>,
    pub action: Option<String>,
    pub solution: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub investment: Option<String>,
    pub status: Option<PlanStatus>,
    pub notes: Option<String>,
    pub clear_notes: bool,
}

impl PlanPatch {
    /// Shorthand for the common single-field status change.
    pub fn status(status: PlanStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Apply this patch to an in-memory plan (the local half of the
    /// apply-locally / persist / reconcile cycle).
    pub fn apply_to(&self, plan: &mut ActionPlan) {
        if let Some(v) = self.date_time {
            plan.date_time = v;
        }
        if let Some(ref v) = self.department {
            plan.department = v.clone();
        }
        if let Some(ref v) = self.responsible {
            plan.responsible = v.clone();
        }
        if let Some(ref v) = self.action {
            plan.action = v.clone();
        }
        if let Some(ref v) = self.solution {
            plan.solution = v.clone();
        }
        if let Some(v) = self.start_date {
            plan.start_date = v;
        }
        if let Some(v) = self.end_date {
            plan.end_date = v;
        }
        if let Some(ref v) = self.investment {
            plan.investment = v.clone();
        }
        if let Some(v) = self.status {
            plan.status = v;
        }
        if self.clear_notes {
            plan.notes = None;
        } else if let Some(ref v) = self.notes {
            plan.notes = Some(v.clone());
        }
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Active,
    Inactive,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Active => "Ativo",
            Self::Inactive => "Inativo",
        }
    }
}

impl std::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user as shown in the management table. `email`, `department`, `role`, and
/// `status` live on the identity-provider record and are only present in a
/// privileged listing; a degraded listing carries `None` for all of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub status: Option<UserStatus>,
}

/// Payload for creating a user. The password is write-only: consumed by the
/// identity provider, never stored or re-displayed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub department: Option<String>,
    pub role: Option<String>,
    pub status: UserStatus,
}

/// Per-field patch for user edits. Email is immutable after creation and has
/// no slot here.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub department: Option<String>,
    pub role: Option<String>,
    pub status: Option<UserStatus>,
    /// Write-only password reset.
    pub password: Option<String>,
}

/// Row shape of the `profiles` table (field names are the column names).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl Profile {
    /// Best display name for the profile.
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .or(self.username.as_deref())
            .unwrap_or(self.id.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
