//! Monthly budgets, per-category allocations and balance reconciliation

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, warn};

use super::{conflict_on_unique, parse_date_column, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Budget, BudgetAllocation, BudgetWithSavings, Reconciliation};
use crate::period::{month_start, DateRange};

const DUPLICATE_BUDGET: &str = "Budget for the same month/year already exists.";

const BUDGET_COLUMNS: &str = "id, user_id, month, budget, current_balance, created_at, updated_at";

/// Whole cents, so limit checks are not thrown off by float rounding
fn cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

fn check_amount(amount: f64, what: &str) -> Result<()> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(Error::validation(format!(
            "{} must be a non-negative number.",
            what
        )));
    }
    Ok(())
}

impl Database {
    /// Create the budget for the month containing `date`
    ///
    /// Every global category is seeded with a zero allocation, and the
    /// balance is reconciled against expenses already recorded that month.
    pub fn create_budget(&self, user_id: i64, date: NaiveDate, amount: f64) -> Result<Budget> {
        check_amount(amount, "Budget")?;
        let month = month_start(date);

        if self.find_budget_id(user_id, month)?.is_some() {
            return Err(Error::conflict(DUPLICATE_BUDGET));
        }

        let categories = self.list_categories()?;

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        conflict_on_unique(
            tx.execute(
                "INSERT INTO budgets (user_id, month, budget, current_balance) VALUES (?, ?, ?, ?)",
                params![user_id, month.to_string(), amount, amount],
            ),
            DUPLICATE_BUDGET,
        )?;
        let budget_id = tx.last_insert_rowid();
        for category in &categories {
            tx.execute(
                "INSERT INTO budget_categories (budget_id, category_id, category_name, budget_amount) VALUES (?, ?, ?, 0)",
                params![budget_id, category.id, category.category_name],
            )?;
        }
        tx.commit()?;
        drop(conn);

        info!(
            user_id,
            budget_id,
            month = %month.format("%Y-%m"),
            amount,
            categories = categories.len(),
            "Budget created"
        );

        self.reconcile_budget(user_id, DateRange::month_of(month))?;
        self.require_budget(budget_id)
    }

    /// Get the budget for the month containing `date`
    pub fn get_budget(&self, user_id: i64, date: NaiveDate) -> Result<Option<Budget>> {
        match self.find_budget_id(user_id, month_start(date))? {
            Some(id) => Ok(Some(self.require_budget(id)?)),
            None => Ok(None),
        }
    }

    /// List all of a user's budgets, oldest month first
    pub fn list_budgets(&self, user_id: i64) -> Result<Vec<Budget>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM budgets WHERE user_id = ? ORDER BY month",
            BUDGET_COLUMNS
        ))?;
        let mut budgets = stmt
            .query_map(params![user_id], row_to_budget)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        for budget in &mut budgets {
            budget.budget_per_category = load_allocations(&conn, budget.id)?;
        }

        Ok(budgets)
    }

    /// Get one category's allocation within a month's budget
    pub fn get_budget_allocation(
        &self,
        user_id: i64,
        date: NaiveDate,
        category_name: &str,
    ) -> Result<BudgetAllocation> {
        let budget = self
            .get_budget(user_id, date)?
            .ok_or_else(|| Error::not_found("Budget not found for the specified date."))?;
        budget
            .allocation(category_name.trim())
            .cloned()
            .ok_or_else(|| Error::not_found("Category not found in the budget."))
    }

    /// Change a month's total budget
    ///
    /// The new total may not drop below what is already allocated.
    pub fn edit_budget(&self, user_id: i64, date: NaiveDate, amount: f64) -> Result<Budget> {
        check_amount(amount, "Budget")?;

        let budget = self
            .get_budget(user_id, date)?
            .ok_or_else(|| Error::not_found("Budget not found for the specified month."))?;

        let allocated = budget.allocated();
        let allocated_cents: i64 = budget
            .budget_per_category
            .iter()
            .map(|a| cents(a.budget_amount))
            .fold(0, i64::saturating_add);
        if cents(amount) < allocated_cents {
            return Err(Error::validation(format!(
                "Budget cannot be less than the {} already allocated to categories.",
                allocated
            )));
        }

        let conn = self.conn()?;
        conn.execute(
            "UPDATE budgets SET budget = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
            params![amount, budget.id],
        )?;
        drop(conn);

        info!(user_id, budget_id = budget.id, amount, "Budget edited");

        self.reconcile_budget(user_id, DateRange::month_of(budget.date))?;
        self.require_budget(budget.id)
    }

    /// Set the amount allocated to a category for a month
    ///
    /// Fails if the allocations would add up to more than the total budget.
    pub fn allocate(
        &self,
        user_id: i64,
        date: NaiveDate,
        category_name: &str,
        amount: f64,
    ) -> Result<BudgetWithSavings> {
        check_amount(amount, "Budget amount")?;

        let budget = self
            .get_budget(user_id, date)?
            .ok_or_else(|| Error::not_found("Budget not found for the specified date."))?;
        let category = self
            .get_category_by_name(category_name.trim())?
            .ok_or_else(|| Error::not_found("Category not found."))?;

        let others: i64 = budget
            .budget_per_category
            .iter()
            .filter(|a| a.category_id != category.id)
            .map(|a| cents(a.budget_amount))
            .fold(0, i64::saturating_add);
        if others.saturating_add(cents(amount)) > cents(budget.budget) {
            debug!(budget = budget.budget, others_cents = others, amount, "Allocation rejected");
            return Err(Error::validation("Budget exceeded for the month."));
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            r#"
            INSERT INTO budget_categories (budget_id, category_id, category_name, budget_amount)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(budget_id, category_id) DO UPDATE SET
                category_name = excluded.category_name,
                budget_amount = excluded.budget_amount
            "#,
            params![budget.id, category.id, category.category_name, amount],
        )?;
        tx.execute(
            "UPDATE budgets SET updated_at = CURRENT_TIMESTAMP WHERE id = ?",
            params![budget.id],
        )?;
        tx.commit()?;
        drop(conn);

        info!(
            user_id,
            budget_id = budget.id,
            category = %category.category_name,
            amount,
            "Budget allocated"
        );

        Ok(self.require_budget(budget.id)?.into())
    }

    /// Remove one allocation from one of the user's budgets
    pub fn delete_allocation(&self, user_id: i64, allocation_id: i64) -> Result<Budget> {
        let conn = self.conn()?;
        let budget_id: Option<i64> = conn
            .query_row(
                r#"
                SELECT b.id FROM budget_categories bc
                JOIN budgets b ON b.id = bc.budget_id
                WHERE bc.id = ? AND b.user_id = ?
                "#,
                params![allocation_id, user_id],
                |row| row.get(0),
            )
            .optional()?;
        let budget_id =
            budget_id.ok_or_else(|| Error::not_found("Budget category not found."))?;

        conn.execute(
            "DELETE FROM budget_categories WHERE id = ?",
            params![allocation_id],
        )?;
        conn.execute(
            "UPDATE budgets SET updated_at = CURRENT_TIMESTAMP WHERE id = ?",
            params![budget_id],
        )?;
        drop(conn);

        info!(user_id, budget_id, allocation_id, "Budget allocation deleted");

        self.require_budget(budget_id)
    }

    /// Recompute `current_balance` for the user's budget covering `range`
    ///
    /// The balance becomes the budget total minus the sum of the expense day
    /// totals inside the window. A month without a budget is not an error.
    pub fn reconcile_budget(&self, user_id: i64, range: DateRange) -> Result<Reconciliation> {
        let month = month_start(range.start);
        let conn = self.conn()?;
        let row: Option<(i64, f64)> = conn
            .query_row(
                "SELECT id, budget FROM budgets WHERE user_id = ? AND month = ?",
                params![user_id, month.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        drop(conn);

        let Some((budget_id, budget)) = row else {
            info!(user_id, month = %month.format("%Y-%m"), "No budget found for this month");
            return Ok(Reconciliation::NoBudget);
        };

        let expenses_total = self.sum_expenses(user_id, range)?;
        let current_balance = budget - expenses_total;
        if current_balance < 0.0 {
            warn!(user_id, budget_id, current_balance, "Budget overspent");
        }

        let conn = self.conn()?;
        conn.execute(
            "UPDATE budgets SET current_balance = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
            params![current_balance, budget_id],
        )?;

        debug!(user_id, budget_id, expenses_total, current_balance, "Budget reconciled");

        Ok(Reconciliation::Updated {
            budget_id,
            expenses_total,
            current_balance,
        })
    }

    /// Reconcile every budget a user has
    pub fn reconcile_all(&self, user_id: i64) -> Result<Vec<Reconciliation>> {
        self.list_budgets(user_id)?
            .iter()
            .map(|b| self.reconcile_budget(user_id, DateRange::month_of(b.date)))
            .collect()
    }

    fn find_budget_id(&self, user_id: i64, month: NaiveDate) -> Result<Option<i64>> {
        let conn = self.conn()?;
        let id = conn
            .query_row(
                "SELECT id FROM budgets WHERE user_id = ? AND month = ?",
                params![user_id, month.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    fn require_budget(&self, budget_id: i64) -> Result<Budget> {
        let conn = self.conn()?;
        let mut budget = conn
            .query_row(
                &format!("SELECT {} FROM budgets WHERE id = ?", BUDGET_COLUMNS),
                params![budget_id],
                row_to_budget,
            )
            .optional()?
            .ok_or_else(|| Error::not_found("Budget not found"))?;
        budget.budget_per_category = load_allocations(&conn, budget_id)?;
        Ok(budget)
    }
}

fn load_allocations(conn: &Connection, budget_id: i64) -> Result<Vec<BudgetAllocation>> {
    let mut stmt = conn.prepare(
        "SELECT id, category_id, category_name, budget_amount FROM budget_categories WHERE budget_id = ? ORDER BY category_name",
    )?;
    let allocations = stmt
        .query_map(params![budget_id], |row| {
            Ok(BudgetAllocation {
                id: row.get(0)?,
                category_id: row.get(1)?,
                category_name: row.get(2)?,
                budget_amount: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(allocations)
}

fn row_to_budget(row: &rusqlite::Row) -> rusqlite::Result<Budget> {
    let month_str: String = row.get(2)?;
    let created_at_str: String = row.get(5)?;
    let updated_at_str: String = row.get(6)?;
    Ok(Budget {
        id: row.get(0)?,
        user_id: row.get(1)?,
        date: parse_date_column(&month_str),
        budget: row.get(3)?,
        current_balance: row.get(4)?,
        budget_per_category: Vec::new(),
        created_at: parse_datetime(&created_at_str),
        updated_at: parse_datetime(&updated_at_str),
    })
}
