//! Category management commands

use anyhow::Result;
use spendwise_core::db::Database;

pub fn cmd_categories_list(db: &Database) -> Result<()> {
    let categories = db.list_categories()?;

    if categories.is_empty() {
        println!("No categories yet. Add one with: spendwise categories add <NAME>");
        return Ok(());
    }

    println!();
    println!("🏷️  Categories ({})", categories.len());
    for category in &categories {
        println!("   {:>4}  {}", category.id, category.category_name);
    }
    println!();

    Ok(())
}

pub fn cmd_categories_add(db: &Database, name: &str) -> Result<()> {
    let category = db.create_category(name)?;
    db.log_audit(
        "cli",
        "create",
        Some("category"),
        Some(category.id),
        Some(&format!("name={}", category.category_name)),
    )?;

    println!(
        "✅ Added category '{}' (id {})",
        category.category_name, category.id
    );
    Ok(())
}
