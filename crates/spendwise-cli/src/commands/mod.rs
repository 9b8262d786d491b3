//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Database initialization and shared utilities (open_db, find_user)
//! - `serve` - Web server command
//! - `users` - User listing
//! - `categories` - Global category management
//! - `budget` - Budget display and reconciliation
//! - `audit` - Audit log display

pub mod audit;
pub mod budget;
pub mod categories;
pub mod core;
pub mod serve;
pub mod users;

// Re-export command functions for main.rs
pub use audit::*;
pub use budget::*;
pub use categories::*;
pub use self::core::*;
pub use serve::*;
pub use users::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
