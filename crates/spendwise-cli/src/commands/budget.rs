//! Budget display and reconciliation commands

use anyhow::{Context, Result};
use spendwise_core::db::Database;
use spendwise_core::models::Reconciliation;
use spendwise_core::period::parse_month;

use super::find_user;

pub fn cmd_budget(db: &Database, username: &str, month: &str) -> Result<()> {
    let user = find_user(db, username)?;
    let range = parse_month(month)?;

    let budget = db
        .get_budget(user.id, range.start)?
        .with_context(|| format!("No budget for {} in {}", user.username, month))?;
    let spent = db.sum_expenses(user.id, range)?;

    println!();
    println!(
        "💰 Budget for {} - {}",
        user.username,
        budget.date.format("%B %Y")
    );
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Total:           {:>12.2}", budget.budget);
    println!("   Spent:           {:>12.2}", spent);
    println!("   Current balance: {:>12.2}", budget.current_balance);
    println!("   Unallocated:     {:>12.2}", budget.savings());

    if !budget.budget_per_category.is_empty() {
        println!();
        println!("   Allocations:");
        for allocation in &budget.budget_per_category {
            println!(
                "   {:>4}  {:<24} {:>12.2}",
                allocation.id, allocation.category_name, allocation.budget_amount
            );
        }
    }

    if (budget.current_balance - (budget.budget - spent)).abs() > 0.005 {
        println!();
        println!(
            "   ⚠️  Balance is out of date, run: spendwise reconcile --user {} --month {}",
            user.username,
            budget.date.format("%Y-%m")
        );
    }
    println!();

    Ok(())
}

pub fn cmd_reconcile(db: &Database, username: &str, month: Option<&str>) -> Result<()> {
    let user = find_user(db, username)?;
    tracing::debug!(user = %user.username, month = ?month, "Reconciling budgets");

    let outcomes = match month {
        Some(month) => {
            let range = parse_month(month)?;
            vec![db.reconcile_budget(user.id, range)?]
        }
        None => db.reconcile_all(user.id)?,
    };

    let mut updated = 0;
    for outcome in &outcomes {
        match outcome {
            Reconciliation::Updated {
                budget_id,
                expenses_total,
                current_balance,
            } => {
                updated += 1;
                println!(
                    "   Budget {:>4}: spent {:>10.2}, balance {:>10.2}",
                    budget_id, expenses_total, current_balance
                );
            }
            Reconciliation::NoBudget => {
                println!("   No budget found for this month");
            }
        }
    }

    db.log_audit(
        "cli",
        "reconcile",
        Some("budget"),
        None,
        Some(&format!("user={}, budgets={}", user.username, updated)),
    )?;

    println!("✅ Reconciled {} budget(s) for {}", updated, user.username);
    Ok(())
}
