//! Actaplan: the headless core of an action-plan record manager.
//!
//! Meeting minutes go in; structured remediation tasks come out via a hosted
//! generative-text model, get reviewed in an in-memory staging area, and are
//! persisted one row at a time to a hosted row store. The crate owns prompt
//! construction, reply parsing and validation, staging, repositories with
//! field↔column mapping, list-view logic (search/filter/sort/paginate), the
//! two-phase-commit edit cycle, and the session gate. Rendering and routing
//! chrome are the thin shell on top and live elsewhere.

pub mod auth;
pub mod config;
pub mod controller;
pub mod extraction;
pub mod list_view;
pub mod oracle;
pub mod repository;
pub mod session;
pub mod store;
pub mod types;
