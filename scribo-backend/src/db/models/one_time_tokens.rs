//! Email-verification and password-reset token operations

use chrono::{Duration, Utc};
use rusqlite::{OptionalExtension, TransactionBehavior, params};

use super::auth_sessions::{generate_token, hash_token};
use super::super::sqlite::{DbResult, parse_ts, ts};
use super::super::Database;
use crate::models::TokenPurpose;

impl Database {
    /// Issue a token for `purpose`, replacing any outstanding one of the same purpose.
    /// Returns the raw token to hand to the user.
    pub fn issue_one_time_token(&self, user_id: &str, purpose: TokenPurpose) -> DbResult<String> {
        let mut conn = self.conn()?;
        let token = generate_token();
        let now = Utc::now();
        let expires_at = now + Duration::minutes(purpose.ttl_minutes());

        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM one_time_tokens WHERE user_id = ?1 AND purpose = ?2",
            params![user_id, purpose.as_str()],
        )?;
        tx.execute(
            "INSERT INTO one_time_tokens (token_hash, user_id, purpose, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![hash_token(&token), user_id, purpose.as_str(), ts(&now), ts(&expires_at)],
        )?;
        tx.commit()?;

        Ok(token)
    }

    /// Redeem a token. The row is deleted whether or not it had expired;
    /// returns the owning user id only for a live token of the right purpose.
    pub fn consume_one_time_token(&self, token: &str, purpose: TokenPurpose) -> DbResult<Option<String>> {
        let mut conn = self.conn()?;
        let token_hash = hash_token(token);

        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let row: Option<(String, String)> = tx
            .query_row(
                "SELECT user_id, expires_at FROM one_time_tokens WHERE token_hash = ?1 AND purpose = ?2",
                params![token_hash, purpose.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((user_id, expires_at)) = row else {
            return Ok(None);
        };

        tx.execute(
            "DELETE FROM one_time_tokens WHERE token_hash = ?1",
            params![token_hash],
        )?;
        tx.commit()?;

        if parse_ts(1, &expires_at)? <= Utc::now() {
            return Ok(None);
        }
        Ok(Some(user_id))
    }

    pub fn purge_expired_one_time_tokens(&self) -> DbResult<usize> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "DELETE FROM one_time_tokens WHERE expires_at <= ?1",
            params![ts(&Utc::now())],
        )?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_token_is_single_use_and_purpose_bound() {
        let dir = tempdir().unwrap();
        let db = Database::new(dir.path().join("test.db").to_str().unwrap()).unwrap();
        let user = db.create_user("Ada", "ada@example.com", "hash").unwrap();

        let token = db.issue_one_time_token(&user.id, TokenPurpose::VerifyEmail).unwrap();

        assert!(db
            .consume_one_time_token(&token, TokenPurpose::ResetPassword)
            .unwrap()
            .is_none());
        assert_eq!(
            db.consume_one_time_token(&token, TokenPurpose::VerifyEmail).unwrap().as_deref(),
            Some(user.id.as_str())
        );
        assert!(db
            .consume_one_time_token(&token, TokenPurpose::VerifyEmail)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_reissue_invalidates_previous_token() {
        let dir = tempdir().unwrap();
        let db = Database::new(dir.path().join("test.db").to_str().unwrap()).unwrap();
        let user = db.create_user("Ada", "ada@example.com", "hash").unwrap();

        let first = db.issue_one_time_token(&user.id, TokenPurpose::ResetPassword).unwrap();
        let second = db.issue_one_time_token(&user.id, TokenPurpose::ResetPassword).unwrap();

        assert!(db
            .consume_one_time_token(&first, TokenPurpose::ResetPassword)
            .unwrap()
            .is_none());
        assert!(db
            .consume_one_time_token(&second, TokenPurpose::ResetPassword)
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_concurrent_redeem_succeeds_once() {
        let dir = tempdir().unwrap();
        let db = std::sync::Arc::new(
            Database::new(dir.path().join("test.db").to_str().unwrap()).unwrap(),
        );
        let user = db.create_user("Ada", "ada@example.com", "hash").unwrap();
        let token = db.issue_one_time_token(&user.id, TokenPurpose::ResetPassword).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let db = std::sync::Arc::clone(&db);
                let token = token.clone();
                std::thread::spawn(move || {
                    db.consume_one_time_token(&token, TokenPurpose::ResetPassword)
                })
            })
            .collect();

        let redeemed = handles
            .into_iter()
            .map(|h| h.join().unwrap().expect("redeem should not hit a locked database"))
            .filter(Option::is_some)
            .count();
        assert_eq!(redeemed, 1);
    }
}
