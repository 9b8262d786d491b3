//! Expense day buckets and line items
//!
//! Every mutation rewrites the bucket's `total_amount` in the same SQLite
//! transaction as the line change, then reconciles the month's budget.

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use super::{conflict_on_unique, parse_date_column, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{ExpenseDay, ExpenseItem, NewExpenseItem, SubCategory};
use crate::period::DateRange;

const DUPLICATE_DAY: &str = "Expenses with the same user and date already Exists.";

const DAY_COLUMNS: &str = "id, user_id, date, total_amount, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, category_id, category_name, sub_category_id, sub_category_name, title, quantity, amount, currency, description, total_amount";

/// A line item whose sub-category has been resolved
struct ResolvedItem<'a> {
    input: &'a NewExpenseItem,
    sub_category: SubCategory,
}

impl Database {
    /// Create the bucket for a (user, date) with its first line items
    pub fn create_expense_day(
        &self,
        user_id: i64,
        date: NaiveDate,
        items: &[NewExpenseItem],
    ) -> Result<ExpenseDay> {
        if self.find_expense_day_id(user_id, date)?.is_some() {
            return Err(Error::conflict(DUPLICATE_DAY));
        }
        if items.is_empty() {
            return Err(Error::validation("Expenses array is required."));
        }

        let resolved = items
            .iter()
            .map(|item| self.resolve_item(user_id, item))
            .collect::<Result<Vec<_>>>()?;

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        conflict_on_unique(
            tx.execute(
                "INSERT INTO expense_days (user_id, date) VALUES (?, ?)",
                params![user_id, date.to_string()],
            ),
            DUPLICATE_DAY,
        )?;
        let day_id = tx.last_insert_rowid();
        for item in &resolved {
            insert_item(&tx, day_id, item)?;
        }
        let total = refresh_day_total(&tx, day_id)?;
        tx.commit()?;
        drop(conn);

        info!(user_id, %date, items = resolved.len(), total, "New expenses created");

        self.reconcile_budget(user_id, DateRange::month_of(date))?;
        self.require_expense_day(day_id)
    }

    /// Append one line item to an existing bucket
    pub fn append_expense_item(
        &self,
        user_id: i64,
        date: NaiveDate,
        item: &NewExpenseItem,
    ) -> Result<ExpenseDay> {
        let day_id = self.find_expense_day_id(user_id, date)?.ok_or_else(|| {
            Error::not_found("No expenses found for the specified date and user.")
        })?;
        let resolved = self.resolve_item(user_id, item)?;

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        insert_item(&tx, day_id, &resolved)?;
        let total = refresh_day_total(&tx, day_id)?;
        tx.commit()?;
        drop(conn);

        info!(user_id, %date, total, "New expense item added");

        self.reconcile_budget(user_id, DateRange::month_of(date))?;
        self.require_expense_day(day_id)
    }

    /// Replace the fields of one line item
    pub fn edit_expense_item(
        &self,
        user_id: i64,
        item_id: i64,
        item: &NewExpenseItem,
    ) -> Result<ExpenseDay> {
        let (day_id, date) = self
            .find_item_owner(user_id, item_id)?
            .ok_or_else(|| Error::not_found("Expense not found."))?;
        let resolved = self.resolve_item(user_id, item)?;

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            r#"
            UPDATE expense_items SET
                category_id = ?, category_name = ?, sub_category_id = ?, sub_category_name = ?,
                title = ?, quantity = ?, amount = ?, currency = ?, description = ?, total_amount = ?
            WHERE id = ?
            "#,
            params![
                resolved.sub_category.category_id,
                resolved.sub_category.category_name,
                resolved.sub_category.id,
                resolved.sub_category.sub_category_name,
                resolved.input.title,
                resolved.input.quantity,
                resolved.input.amount,
                resolved.input.currency,
                resolved.input.description,
                resolved.input.total(),
                item_id,
            ],
        )?;
        let total = refresh_day_total(&tx, day_id)?;
        tx.commit()?;
        drop(conn);

        info!(user_id, item_id, %date, total, "Expense item edited");

        self.reconcile_budget(user_id, DateRange::month_of(date))?;
        self.require_expense_day(day_id)
    }

    /// Remove one line item, returning the bucket as it is afterwards
    ///
    /// Removing the last line leaves an empty bucket with a zero total.
    pub fn delete_expense_item(&self, user_id: i64, item_id: i64) -> Result<ExpenseDay> {
        let (day_id, date) = self
            .find_item_owner(user_id, item_id)?
            .ok_or_else(|| Error::not_found("Expense not found for the specified ID."))?;

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM expense_items WHERE id = ?", params![item_id])?;
        let total = refresh_day_total(&tx, day_id)?;
        tx.commit()?;
        drop(conn);

        info!(user_id, item_id, %date, total, "Expense item deleted");

        self.reconcile_budget(user_id, DateRange::month_of(date))?;
        self.require_expense_day(day_id)
    }

    /// Delete a whole day bucket, returning what was deleted
    pub fn delete_expense_day(&self, user_id: i64, date: NaiveDate) -> Result<ExpenseDay> {
        let day = self
            .get_expense_day(user_id, date)?
            .ok_or_else(|| Error::not_found("No expenses found for the specified date."))?;

        let conn = self.conn()?;
        conn.execute("DELETE FROM expense_days WHERE id = ?", params![day.id])?;
        drop(conn);

        info!(user_id, %date, "Expenses for day deleted");

        self.reconcile_budget(user_id, DateRange::month_of(date))?;
        Ok(day)
    }

    /// Get the bucket for a (user, date)
    pub fn get_expense_day(&self, user_id: i64, date: NaiveDate) -> Result<Option<ExpenseDay>> {
        match self.find_expense_day_id(user_id, date)? {
            Some(id) => Ok(Some(self.require_expense_day(id)?)),
            None => Ok(None),
        }
    }

    /// Get one of a user's line items
    pub fn get_expense_item(&self, user_id: i64, item_id: i64) -> Result<Option<ExpenseItem>> {
        let conn = self.conn()?;
        let item = conn
            .query_row(
                &format!(
                    r#"
                    SELECT {} FROM expense_items
                    WHERE id = ?
                      AND expense_day_id IN (SELECT id FROM expense_days WHERE user_id = ?)
                    "#,
                    ITEM_COLUMNS
                ),
                params![item_id, user_id],
                row_to_item,
            )
            .optional()?;
        Ok(item)
    }

    /// List a user's buckets, oldest first, optionally within a date range
    pub fn list_expense_days(
        &self,
        user_id: i64,
        range: Option<DateRange>,
    ) -> Result<Vec<ExpenseDay>> {
        let conn = self.conn()?;

        let mut days = match range {
            Some(range) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM expense_days WHERE user_id = ? AND date >= ? AND date < ? ORDER BY date",
                    DAY_COLUMNS
                ))?;
                let rows = stmt
                    .query_map(
                        params![user_id, range.start.to_string(), range.end.to_string()],
                        row_to_day,
                    )?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM expense_days WHERE user_id = ? ORDER BY date",
                    DAY_COLUMNS
                ))?;
                let rows = stmt
                    .query_map(params![user_id], row_to_day)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
        };

        for day in &mut days {
            day.expenses = load_items(&conn, day.id)?;
        }

        Ok(days)
    }

    /// Sum of the bucket totals for a user within a date range
    pub fn sum_expenses(&self, user_id: i64, range: DateRange) -> Result<f64> {
        let conn = self.conn()?;
        let total: f64 = conn.query_row(
            "SELECT COALESCE(SUM(total_amount), 0) FROM expense_days WHERE user_id = ? AND date >= ? AND date < ?",
            params![user_id, range.start.to_string(), range.end.to_string()],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    fn find_expense_day_id(&self, user_id: i64, date: NaiveDate) -> Result<Option<i64>> {
        let conn = self.conn()?;
        let id = conn
            .query_row(
                "SELECT id FROM expense_days WHERE user_id = ? AND date = ?",
                params![user_id, date.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    /// Find the bucket (id, date) that owns a user's line item
    fn find_item_owner(&self, user_id: i64, item_id: i64) -> Result<Option<(i64, NaiveDate)>> {
        let conn = self.conn()?;
        let owner = conn
            .query_row(
                r#"
                SELECT d.id, d.date
                FROM expense_items i
                JOIN expense_days d ON d.id = i.expense_day_id
                WHERE i.id = ? AND d.user_id = ?
                "#,
                params![item_id, user_id],
                |row| {
                    let date_str: String = row.get(1)?;
                    Ok((row.get(0)?, parse_date_column(&date_str)))
                },
            )
            .optional()?;
        Ok(owner)
    }

    fn require_expense_day(&self, day_id: i64) -> Result<ExpenseDay> {
        let conn = self.conn()?;
        let mut day = conn
            .query_row(
                &format!("SELECT {} FROM expense_days WHERE id = ?", DAY_COLUMNS),
                params![day_id],
                row_to_day,
            )
            .optional()?
            .ok_or_else(|| Error::not_found("Expense day not found"))?;
        day.expenses = load_items(&conn, day_id)?;
        Ok(day)
    }

    /// Validate a line item and look up its sub-category
    fn resolve_item<'a>(&self, user_id: i64, item: &'a NewExpenseItem) -> Result<ResolvedItem<'a>> {
        if !item.quantity.is_finite() || item.quantity <= 0.0 {
            return Err(Error::validation("Quantity must be greater than zero."));
        }
        if !item.amount.is_finite() || item.amount < 0.0 {
            return Err(Error::validation("Amount must not be negative."));
        }
        if !item.total().is_finite() {
            return Err(Error::validation("Expense total is too large."));
        }

        let sub_category = self
            .get_sub_category_by_name(user_id, item.sub_category_name.trim())?
            .ok_or_else(|| Error::not_found("Subcategory not found."))?;
        debug!(
            sub_category = %sub_category.sub_category_name,
            category = %sub_category.category_name,
            "Resolved expense sub-category"
        );

        Ok(ResolvedItem {
            input: item,
            sub_category,
        })
    }
}

fn insert_item(conn: &Connection, day_id: i64, item: &ResolvedItem<'_>) -> Result<i64> {
    conn.execute(
        r#"
        INSERT INTO expense_items (
            expense_day_id, category_id, category_name, sub_category_id, sub_category_name,
            title, quantity, amount, currency, description, total_amount
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
        params![
            day_id,
            item.sub_category.category_id,
            item.sub_category.category_name,
            item.sub_category.id,
            item.sub_category.sub_category_name,
            item.input.title,
            item.input.quantity,
            item.input.amount,
            item.input.currency,
            item.input.description,
            item.input.total(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Recompute and store a bucket's total from its line items
fn refresh_day_total(conn: &Connection, day_id: i64) -> Result<f64> {
    let mut stmt =
        conn.prepare("SELECT total_amount FROM expense_items WHERE expense_day_id = ?")?;
    let total = stmt
        .query_map(params![day_id], |row| row.get::<_, f64>(0))?
        .sum::<rusqlite::Result<f64>>()?;
    // Dropping the caller's transaction rolls the write back
    if !total.is_finite() {
        return Err(Error::validation("Expense total is too large."));
    }

    conn.execute(
        "UPDATE expense_days SET total_amount = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
        params![total, day_id],
    )?;
    Ok(total)
}

fn load_items(conn: &Connection, day_id: i64) -> Result<Vec<ExpenseItem>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM expense_items WHERE expense_day_id = ? ORDER BY id",
        ITEM_COLUMNS
    ))?;
    let items = stmt
        .query_map(params![day_id], row_to_item)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(items)
}

fn row_to_day(row: &rusqlite::Row) -> rusqlite::Result<ExpenseDay> {
    let date_str: String = row.get(2)?;
    let created_at_str: String = row.get(4)?;
    let updated_at_str: String = row.get(5)?;
    Ok(ExpenseDay {
        id: row.get(0)?,
        user_id: row.get(1)?,
        date: parse_date_column(&date_str),
        total: row.get(3)?,
        expenses: Vec::new(),
        created_at: parse_datetime(&created_at_str),
        updated_at: parse_datetime(&updated_at_str),
    })
}

fn row_to_item(row: &rusqlite::Row) -> rusqlite::Result<ExpenseItem> {
    Ok(ExpenseItem {
        id: row.get(0)?,
        category_id: row.get(1)?,
        category_name: row.get(2)?,
        sub_category_id: row.get(3)?,
        sub_category_name: row.get(4)?,
        title: row.get(5)?,
        quantity: row.get(6)?,
        amount: row.get(7)?,
        currency: row.get(8)?,
        description: row.get(9)?,
        total: row.get(10)?,
    })
}
