//! Spendwise Core Library
//!
//! Shared functionality for the Spendwise personal finance backend:
//! - Database access and migrations
//! - Users with Argon2 password hashes
//! - Global categories and per-user sub-categories
//! - Expense day buckets and their line items
//! - Monthly budgets, category allocations and balance reconciliation
//! - Date windows (month, week, year) for listings and reconciliation

pub mod db;
pub mod error;
pub mod models;
pub mod password;
pub mod period;

pub use db::{AuditEntry, Database};
pub use error::{Error, Result};
pub use period::DateRange;
