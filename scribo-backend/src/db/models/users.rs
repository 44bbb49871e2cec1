//! User account database operations

use chrono::Utc;
use rusqlite::{OptionalExtension, Row, TransactionBehavior, params};
use uuid::Uuid;

use super::super::sqlite::{DbResult, parse_ts, ts};
use super::super::Database;
use crate::models::User;

const USER_COLUMNS: &str =
    "id, name, email, password_hash, bio, avatar, email_verified, created_at, updated_at";

fn map_user(row: &Row<'_>) -> rusqlite::Result<User> {
    let created_at: String = row.get(7)?;
    let updated_at: String = row.get(8)?;
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        bio: row.get(4)?,
        avatar: row.get(5)?,
        email_verified: row.get(6)?,
        created_at: parse_ts(7, &created_at)?,
        updated_at: parse_ts(8, &updated_at)?,
    })
}

impl Database {
    /// Insert a new, unverified user. Fails with a constraint violation on duplicate email.
    pub fn create_user(&self, name: &str, email: &str, password_hash: &str) -> DbResult<User> {
        let conn = self.conn()?;
        let now = Utc::now();
        let id = Uuid::new_v4().to_string();

        conn.execute(
            "INSERT INTO users (id, name, email, password_hash, email_verified, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5, ?5)",
            params![id, name, email, password_hash, ts(&now)],
        )?;

        Ok(User {
            id,
            name: name.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            bio: None,
            avatar: None,
            email_verified: false,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn get_user(&self, id: &str) -> DbResult<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
                params![id],
                map_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Lookup by (already lowercased) email
    pub fn get_user_by_email(&self, email: &str) -> DbResult<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS),
                params![email],
                map_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Update name and/or bio. `bio: Some(None)` clears the bio.
    pub fn update_user_profile(
        &self,
        id: &str,
        name: Option<&str>,
        bio: Option<Option<&str>>,
    ) -> DbResult<Option<User>> {
        {
            let conn = self.conn()?;
            let now = ts(&Utc::now());
            if let Some(name) = name {
                conn.execute(
                    "UPDATE users SET name = ?1, updated_at = ?2 WHERE id = ?3",
                    params![name, now, id],
                )?;
            }
            if let Some(bio) = bio {
                conn.execute(
                    "UPDATE users SET bio = ?1, updated_at = ?2 WHERE id = ?3",
                    params![bio, now, id],
                )?;
            }
        }
        self.get_user(id)
    }

    /// Set or clear the avatar file name. Returns the previous file name.
    pub fn set_user_avatar(&self, id: &str, avatar: Option<&str>) -> DbResult<Option<String>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let previous: Option<String> = tx
            .query_row("SELECT avatar FROM users WHERE id = ?1", params![id], |row| row.get(0))
            .optional()?
            .flatten();
        tx.execute(
            "UPDATE users SET avatar = ?1, updated_at = ?2 WHERE id = ?3",
            params![avatar, ts(&Utc::now()), id],
        )?;
        tx.commit()?;
        Ok(previous)
    }

    pub fn set_user_password_hash(&self, id: &str, password_hash: &str) -> DbResult<bool> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "UPDATE users SET password_hash = ?1, updated_at = ?2 WHERE id = ?3",
            params![password_hash, ts(&Utc::now()), id],
        )?;
        Ok(rows > 0)
    }

    pub fn mark_email_verified(&self, id: &str) -> DbResult<bool> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "UPDATE users SET email_verified = 1, updated_at = ?1 WHERE id = ?2",
            params![ts(&Utc::now()), id],
        )?;
        Ok(rows > 0)
    }

    /// Delete a user. Notes, sessions and tokens go with it via ON DELETE CASCADE.
    pub fn delete_user(&self, id: &str) -> DbResult<bool> {
        let conn = self.conn()?;
        let rows = conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }
}
