//! Repositories: the mapping layer between application records and the row
//! store's columns. Each operation is a single-row round trip — there is no
//! batch surface and no rollback across calls.

pub mod plans;
pub mod users;

pub use plans::{PlanOrder, PlanRepository, ACTION_PLANS_TABLE};
pub use users::{fetch_profile, UserListing, UserRepoError, UserRepository, PROFILES_TABLE};
