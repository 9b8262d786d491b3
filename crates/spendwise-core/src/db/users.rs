//! User operations

use rusqlite::{params, OptionalExtension};
use tracing::info;

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{ProfileUpdate, Registration, User};
use crate::password::{hash_password, verify_password};

const USER_COLUMNS: &str =
    "id, username, email, first_name, last_name, created_at, updated_at";

/// Treat blank strings as missing
fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl Database {
    /// Register a new user
    ///
    /// Email, username and password are required; email and username must
    /// not be in use. The password is stored as an Argon2 hash.
    pub fn register_user(&self, registration: &Registration) -> Result<User> {
        let email = non_blank(&registration.email);
        let username = non_blank(&registration.username);
        let password = registration.password.as_deref().filter(|p| !p.is_empty());

        let missing: Vec<&str> = [
            ("email", email.is_none()),
            ("username", username.is_none()),
            ("password", password.is_none()),
        ]
        .iter()
        .filter(|(_, missing)| *missing)
        .map(|(field, _)| *field)
        .collect();

        let (Some(email), Some(username), Some(password)) = (email, username, password) else {
            return Err(Error::validation(format!(
                "Please provide the required fields: {}",
                missing.join(", ")
            )));
        };

        if self.email_exists(email)? {
            return Err(Error::validation(
                "Email already registered. Try logging in or use a different Email.",
            ));
        }
        if self.get_user_by_username(username)?.is_some() {
            return Err(Error::validation(
                "Username already taken. Please choose a different Username",
            ));
        }

        let password_hash = hash_password(password)?;

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO users (username, email, password_hash, first_name, last_name) VALUES (?, ?, ?, ?, ?)",
            params![
                username,
                email,
                password_hash,
                non_blank(&registration.first_name),
                non_blank(&registration.last_name),
            ],
        )?;
        let id = conn.last_insert_rowid();
        drop(conn);

        info!(user_id = id, username, "Registered user");

        self.get_user(id)?
            .ok_or_else(|| Error::not_found("User not found after registration"))
    }

    /// Check an email/password pair, returning the user on success
    pub fn authenticate(&self, email: &str, password: &str) -> Result<User> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(Error::validation("Email and password are mandatory!"));
        }

        let conn = self.conn()?;
        let row: Option<(i64, String)> = conn
            .query_row(
                "SELECT id, password_hash FROM users WHERE email = ?",
                params![email.trim()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        drop(conn);

        match row {
            Some((id, hash)) if verify_password(&hash, password) => self
                .get_user(id)?
                .ok_or_else(|| Error::not_found("User not found")),
            _ => Err(Error::Unauthorized("Incorrect email or password".into())),
        }
    }

    /// Get a user by ID
    pub fn get_user(&self, id: i64) -> Result<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS),
                params![id],
                Self::row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Get a user by username
    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE username = ?", USER_COLUMNS),
                params![username],
                Self::row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    fn email_exists(&self, email: &str) -> Result<bool> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE email = ?",
            params![email],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// List all users
    pub fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM users ORDER BY username",
            USER_COLUMNS
        ))?;

        let users = stmt
            .query_map([], Self::row_to_user)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(users)
    }

    /// Update first/last name and username
    ///
    /// A username already held by a different user is rejected.
    pub fn update_profile(&self, id: i64, update: &ProfileUpdate) -> Result<User> {
        let username = non_blank(&update.username);

        if let Some(username) = username {
            if let Some(existing) = self.get_user_by_username(username)? {
                if existing.id != id {
                    return Err(Error::validation("Username is already taken."));
                }
            }
        }

        let conn = self.conn()?;
        let updated = conn.execute(
            r#"
            UPDATE users SET
                username = COALESCE(?, username),
                first_name = COALESCE(?, first_name),
                last_name = COALESCE(?, last_name),
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
            params![
                username,
                update.first_name.as_deref(),
                update.last_name.as_deref(),
                id
            ],
        )?;
        drop(conn);

        if updated == 0 {
            return Err(Error::not_found("User not found"));
        }

        self.get_user(id)?
            .ok_or_else(|| Error::not_found("User not found"))
    }

    fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
        let created_at_str: String = row.get(5)?;
        let updated_at_str: String = row.get(6)?;
        Ok(User {
            id: row.get(0)?,
            username: row.get(1)?,
            email: row.get(2)?,
            first_name: row.get(3)?,
            last_name: row.get(4)?,
            created_at: parse_datetime(&created_at_str),
            updated_at: parse_datetime(&updated_at_str),
        })
    }
}
