//! Spendwise CLI - Expense and budget tracker
//!
//! Usage:
//!   spendwise init                             Initialize database
//!   spendwise serve --port 5050                Start web server
//!   spendwise budget --user alice --month 2024-03
//!   spendwise reconcile --user alice           Recompute budget balances

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db),
        Commands::Serve {
            port,
            host,
            static_dir,
        } => commands::cmd_serve(&cli.db, &host, port, static_dir.as_deref()).await,
        Commands::Users => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_users(&db)
        }
        Commands::Categories { action } => {
            let db = commands::open_db(&cli.db)?;
            match action {
                None | Some(CategoriesAction::List) => commands::cmd_categories_list(&db),
                Some(CategoriesAction::Add { name }) => commands::cmd_categories_add(&db, &name),
            }
        }
        Commands::Budget { user, month } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_budget(&db, &user, &month)
        }
        Commands::Reconcile { user, month } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_reconcile(&db, &user, month.as_deref())
        }
        Commands::Audit { limit } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_audit(&db, limit)
        }
    }
}
