//! Auth session database operations

use chrono::{Duration, Utc};
use rand::RngCore;
use rusqlite::{OptionalExtension, params};
use sha2::{Digest, Sha256};

use super::super::sqlite::{DbResult, parse_ts, ts};
use super::super::Database;
use crate::models::Session;

/// Hex SHA-256 of a bearer or one-time token. Raw tokens are never stored.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// 256 random bits, hex encoded
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

impl Database {
    /// Create a new auth session for a user. Returns the raw token alongside the stored row.
    pub fn create_session(&self, user_id: &str, ttl_hours: i64) -> DbResult<(String, Session)> {
        let conn = self.conn()?;
        let token = generate_token();
        let token_hash = hash_token(&token);
        let created_at = Utc::now();
        let expires_at = created_at + Duration::hours(ttl_hours);

        conn.execute(
            "INSERT INTO auth_sessions (token_hash, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
            params![token_hash, user_id, ts(&created_at), ts(&expires_at)],
        )?;

        let id = conn.last_insert_rowid();

        Ok((
            token,
            Session {
                id,
                token_hash,
                user_id: user_id.to_string(),
                created_at,
                expires_at,
            },
        ))
    }

    /// Validate a session token digest and extend its expiry if valid
    pub fn validate_session(&self, token_hash: &str, ttl_hours: i64) -> DbResult<Option<Session>> {
        let conn = self.conn()?;
        let now = Utc::now();

        let session = conn
            .query_row(
                "SELECT id, token_hash, user_id, created_at, expires_at FROM auth_sessions
                 WHERE token_hash = ?1 AND expires_at > ?2",
                params![token_hash, ts(&now)],
                |row| {
                    let created_at: String = row.get(3)?;
                    let expires_at: String = row.get(4)?;
                    Ok(Session {
                        id: row.get(0)?,
                        token_hash: row.get(1)?,
                        user_id: row.get(2)?,
                        created_at: parse_ts(3, &created_at)?,
                        expires_at: parse_ts(4, &expires_at)?,
                    })
                },
            )
            .optional()?;

        // Keep active sessions alive
        let Some(mut session) = session else {
            return Ok(None);
        };
        let new_expires = now + Duration::hours(ttl_hours);
        conn.execute(
            "UPDATE auth_sessions SET expires_at = ?1 WHERE id = ?2",
            params![ts(&new_expires), session.id],
        )?;
        session.expires_at = new_expires;

        Ok(Some(session))
    }

    /// Delete a session (logout)
    pub fn delete_session(&self, token_hash: &str) -> DbResult<bool> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "DELETE FROM auth_sessions WHERE token_hash = ?1",
            params![token_hash],
        )?;
        Ok(rows > 0)
    }

    /// Revoke every session of a user, optionally keeping the caller's own
    pub fn delete_user_sessions(&self, user_id: &str, keep_token_hash: Option<&str>) -> DbResult<usize> {
        let conn = self.conn()?;
        let rows = match keep_token_hash {
            Some(keep) => conn.execute(
                "DELETE FROM auth_sessions WHERE user_id = ?1 AND token_hash != ?2",
                params![user_id, keep],
            )?,
            None => conn.execute(
                "DELETE FROM auth_sessions WHERE user_id = ?1",
                params![user_id],
            )?,
        };
        Ok(rows)
    }

    /// Drop sessions whose sliding window has lapsed
    pub fn purge_expired_sessions(&self) -> DbResult<usize> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "DELETE FROM auth_sessions WHERE expires_at <= ?1",
            params![ts(&Utc::now())],
        )?;
        Ok(rows)
    }
}
