//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Spendwise - Track daily expenses against monthly budgets
#[derive(Parser)]
#[command(name = "spendwise")]
#[command(about = "Self-hosted expense and budget tracker", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "spendwise.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Start the web server
    ///
    /// Requires SPENDWISE_TOKEN_SECRET. Optional: SPENDWISE_TOKEN_TTL_MINUTES,
    /// SPENDWISE_ALLOWED_ORIGINS.
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "5050")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Directory of static files to serve alongside the API
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },

    /// List registered users
    Users,

    /// List or add global categories
    Categories {
        #[command(subcommand)]
        action: Option<CategoriesAction>,
    },

    /// Show a user's budget for a month
    Budget {
        /// Username
        #[arg(short, long)]
        user: String,

        /// Month (YYYY-MM)
        #[arg(short, long)]
        month: String,
    },

    /// Recompute budget balances from recorded expenses
    Reconcile {
        /// Username
        #[arg(short, long)]
        user: String,

        /// Only this month (YYYY-MM); all of the user's budgets if omitted
        #[arg(short, long)]
        month: Option<String>,
    },

    /// Show the API audit log
    Audit {
        /// Number of entries to show
        #[arg(short, long, default_value = "50")]
        limit: i64,
    },
}

#[derive(Subcommand)]
pub enum CategoriesAction {
    /// List categories (default)
    List,

    /// Add a category
    Add {
        /// Category name
        name: String,
    },
}
