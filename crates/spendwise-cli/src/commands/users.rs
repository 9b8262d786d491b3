//! User listing command

use anyhow::Result;
use spendwise_core::db::Database;

use super::truncate;

pub fn cmd_users(db: &Database) -> Result<()> {
    let users = db.list_users()?;

    if users.is_empty() {
        println!("No users registered yet.");
        return Ok(());
    }

    println!();
    println!("👤 Users ({})", users.len());
    println!("   ─────────────────────────────────────────────────────────────");
    for user in &users {
        let name = match (&user.first_name, &user.last_name) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            (Some(first), None) => first.clone(),
            (None, Some(last)) => last.clone(),
            (None, None) => String::new(),
        };
        println!(
            "   {:>4}  {:<20} {:<32} {}",
            user.id,
            truncate(&user.username, 20),
            truncate(&user.email, 32),
            name
        );
    }
    println!();

    Ok(())
}
