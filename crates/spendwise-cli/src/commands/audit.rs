//! Audit log command

use anyhow::Result;
use spendwise_core::db::Database;

use super::truncate;

pub fn cmd_audit(db: &Database, limit: i64) -> Result<()> {
    let entries = db.list_audit_log(limit.max(1))?;

    if entries.is_empty() {
        println!("Audit log is empty.");
        return Ok(());
    }

    println!();
    println!("📜 Audit log (latest {})", entries.len());
    for entry in &entries {
        let target = match (&entry.entity_type, entry.entity_id) {
            (Some(kind), Some(id)) => format!("{}#{}", kind, id),
            (Some(kind), None) => kind.clone(),
            _ => String::from("-"),
        };
        println!(
            "   {}  {:<16} {:<8} {:<20} {}",
            entry.timestamp,
            truncate(&entry.actor, 16),
            entry.action,
            target,
            truncate(entry.details.as_deref().unwrap_or(""), 50)
        );
    }
    println!();

    Ok(())
}
