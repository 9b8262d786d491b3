//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `find_user` - Resolve a username given on the command line
//! - `cmd_init` - Initialize the database

use std::path::Path;

use anyhow::{Context, Result};
use spendwise_core::db::Database;
use spendwise_core::models::User;

/// Open (or create) the database, applying migrations
pub fn open_db(db_path: &Path) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path is not valid UTF-8")?;
    Database::new(path_str).context("Failed to open database")
}

/// Look up a user by username
pub fn find_user(db: &Database, username: &str) -> Result<User> {
    db.get_user_by_username(username)?
        .with_context(|| format!("No user named '{}'", username))
}

pub fn cmd_init(db_path: &Path) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let db = open_db(db_path)?;

    let categories = db.list_categories()?;
    println!("   Categories: {}", categories.len());

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Add categories: spendwise categories add Food");
    println!("  2. Start the API: SPENDWISE_TOKEN_SECRET=... spendwise serve");

    Ok(())
}
