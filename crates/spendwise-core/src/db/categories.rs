//! Category and sub-category operations

use rusqlite::{params, OptionalExtension};
use tracing::info;

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Category, SubCategory};

const SUB_CATEGORY_COLUMNS: &str = "id, name, user_id, username, category_id, category_name, created_at, updated_at";

impl Database {
    /// Create a global category. Names are unique.
    pub fn create_category(&self, name: &str) -> Result<Category> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::validation("Enter a Category Name"));
        }
        if self.get_category_by_name(name)?.is_some() {
            return Err(Error::validation("Category Name already Exist."));
        }

        let conn = self.conn()?;
        conn.execute("INSERT INTO categories (name) VALUES (?)", params![name])?;
        let id = conn.last_insert_rowid();
        drop(conn);

        info!(category_id = id, name, "Created category");

        self.get_category(id)?
            .ok_or_else(|| Error::not_found("Category not found after creation"))
    }

    /// List all categories by name
    pub fn list_categories(&self) -> Result<Vec<Category>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, name, created_at FROM categories ORDER BY name")?;

        let categories = stmt
            .query_map([], Self::row_to_category)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(categories)
    }

    /// Get a category by ID
    pub fn get_category(&self, id: i64) -> Result<Option<Category>> {
        let conn = self.conn()?;
        let category = conn
            .query_row(
                "SELECT id, name, created_at FROM categories WHERE id = ?",
                params![id],
                Self::row_to_category,
            )
            .optional()?;
        Ok(category)
    }

    /// Get a category by its exact name
    pub fn get_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        let conn = self.conn()?;
        let category = conn
            .query_row(
                "SELECT id, name, created_at FROM categories WHERE name = ?",
                params![name],
                Self::row_to_category,
            )
            .optional()?;
        Ok(category)
    }

    /// Create a sub-category for a user under an existing category
    pub fn create_sub_category(
        &self,
        user_id: i64,
        sub_category_name: &str,
        category_name: &str,
    ) -> Result<SubCategory> {
        let sub_category_name = sub_category_name.trim();
        let category_name = category_name.trim();
        if sub_category_name.is_empty() || category_name.is_empty() {
            return Err(Error::validation(
                "Subcategory name and category name are required.",
            ));
        }

        let category = self
            .get_category_by_name(category_name)?
            .ok_or_else(|| Error::not_found("Category not found."))?;
        let user = self
            .get_user(user_id)?
            .ok_or_else(|| Error::not_found("User not found"))?;

        if self
            .get_sub_category_by_name(user_id, sub_category_name)?
            .is_some()
        {
            return Err(Error::validation(
                "Subcategory with the same name already exists.",
            ));
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO sub_categories (name, user_id, username, category_id, category_name) VALUES (?, ?, ?, ?, ?)",
            params![
                sub_category_name,
                user_id,
                user.username,
                category.id,
                category.category_name
            ],
        )?;
        let id = conn.last_insert_rowid();
        drop(conn);

        info!(
            sub_category_id = id,
            "New SubCategory added: {} in {} Category", sub_category_name, category.category_name
        );

        self.get_sub_category(user_id, id)?
            .ok_or_else(|| Error::not_found("Subcategory not found after creation"))
    }

    /// List a user's sub-categories
    pub fn list_sub_categories(&self, user_id: i64) -> Result<Vec<SubCategory>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sub_categories WHERE user_id = ? ORDER BY category_name, name",
            SUB_CATEGORY_COLUMNS
        ))?;

        let subs = stmt
            .query_map(params![user_id], Self::row_to_sub_category)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(subs)
    }

    /// Get one of a user's sub-categories by ID
    pub fn get_sub_category(&self, user_id: i64, id: i64) -> Result<Option<SubCategory>> {
        let conn = self.conn()?;
        let sub = conn
            .query_row(
                &format!(
                    "SELECT {} FROM sub_categories WHERE id = ? AND user_id = ?",
                    SUB_CATEGORY_COLUMNS
                ),
                params![id, user_id],
                Self::row_to_sub_category,
            )
            .optional()?;
        Ok(sub)
    }

    /// Get one of a user's sub-categories by name
    pub fn get_sub_category_by_name(
        &self,
        user_id: i64,
        name: &str,
    ) -> Result<Option<SubCategory>> {
        let conn = self.conn()?;
        let sub = conn
            .query_row(
                &format!(
                    "SELECT {} FROM sub_categories WHERE name = ? AND user_id = ?",
                    SUB_CATEGORY_COLUMNS
                ),
                params![name, user_id],
                Self::row_to_sub_category,
            )
            .optional()?;
        Ok(sub)
    }

    /// Rename a sub-category and cascade the new name into expense lines
    ///
    /// Returns the renamed sub-category and the number of expense lines updated.
    pub fn rename_sub_category(
        &self,
        user_id: i64,
        id: i64,
        new_name: &str,
    ) -> Result<(SubCategory, usize)> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(Error::validation("Subcategory name is required."));
        }

        self.get_sub_category(user_id, id)?
            .ok_or_else(|| Error::not_found("Subcategory not found"))?;

        if let Some(existing) = self.get_sub_category_by_name(user_id, new_name)? {
            if existing.id != id {
                return Err(Error::validation(
                    "Subcategory with the same name already exists.",
                ));
            }
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "UPDATE sub_categories SET name = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ? AND user_id = ?",
            params![new_name, id, user_id],
        )?;
        let cascaded = tx.execute(
            "UPDATE expense_items SET sub_category_name = ? WHERE sub_category_id = ?",
            params![new_name, id],
        )?;
        tx.commit()?;
        drop(conn);

        info!(
            sub_category_id = id,
            expense_items = cascaded,
            "Subcategory renamed to {}",
            new_name
        );

        let sub = self
            .get_sub_category(user_id, id)?
            .ok_or_else(|| Error::not_found("Subcategory not found"))?;
        Ok((sub, cascaded))
    }

    /// Delete a sub-category, returning what was deleted
    ///
    /// Expense lines keep their snapshot name; their link is cleared.
    pub fn delete_sub_category(&self, user_id: i64, id: i64) -> Result<SubCategory> {
        let sub = self
            .get_sub_category(user_id, id)?
            .ok_or_else(|| Error::not_found("Subcategory not found."))?;

        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM sub_categories WHERE id = ? AND user_id = ?",
            params![id, user_id],
        )?;

        info!(sub_category_id = id, "Subcategory deleted");
        Ok(sub)
    }

    fn row_to_category(row: &rusqlite::Row) -> rusqlite::Result<Category> {
        let created_at_str: String = row.get(2)?;
        Ok(Category {
            id: row.get(0)?,
            category_name: row.get(1)?,
            created_at: parse_datetime(&created_at_str),
        })
    }

    fn row_to_sub_category(row: &rusqlite::Row) -> rusqlite::Result<SubCategory> {
        let created_at_str: String = row.get(6)?;
        let updated_at_str: String = row.get(7)?;
        Ok(SubCategory {
            id: row.get(0)?,
            sub_category_name: row.get(1)?,
            user_id: row.get(2)?,
            username: row.get(3)?,
            category_id: row.get(4)?,
            category_name: row.get(5)?,
            created_at: parse_datetime(&created_at_str),
            updated_at: parse_datetime(&updated_at_str),
        })
    }
}
