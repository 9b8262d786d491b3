//! Server command implementation

use std::path::Path;

use anyhow::{Context, Result};
use spendwise_server::{ServerConfig, ALLOWED_ORIGINS_ENV, TOKEN_TTL_ENV};

use super::open_db;

pub async fn cmd_serve(
    db_path: &Path,
    host: &str,
    port: u16,
    static_dir: Option<&Path>,
) -> Result<()> {
    // Fail before touching the database if the server cannot issue tokens
    let config = ServerConfig::from_env()?;

    println!("🚀 Starting Spendwise web server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}/api/users", host, port);
    if let Some(dir) = static_dir {
        println!("   Static files: {}", dir.display());
    }
    println!(
        "   🔑 Access tokens: HS256, valid {} min ({})",
        config.token_ttl_minutes, TOKEN_TTL_ENV
    );
    if config.allowed_origins.is_empty() {
        println!("   🌐 CORS: same-origin only ({} not set)", ALLOWED_ORIGINS_ENV);
    } else {
        println!("   🌐 CORS: {}", config.allowed_origins.join(", "));
    }
    println!();

    let db = open_db(db_path)?;

    let static_dir = match static_dir {
        Some(dir) => Some(
            dir.to_str()
                .context("Static directory path is not valid UTF-8")?,
        ),
        None => None,
    };

    spendwise_server::serve_with_config(db, host, port, static_dir, config).await
}
