use chrono::{DateTime, Utc};
use serde::Serialize;

/// A web login session. Only the token digest is stored.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: i64,
    #[serde(skip)]
    pub token_hash: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// What a one-time token may be redeemed for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPurpose {
    VerifyEmail,
    ResetPassword,
}

impl TokenPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenPurpose::VerifyEmail => "verify_email",
            TokenPurpose::ResetPassword => "reset_password",
        }
    }

    /// Lifetime of a freshly issued token, in minutes
    pub fn ttl_minutes(&self) -> i64 {
        match self {
            TokenPurpose::VerifyEmail => 24 * 60,
            TokenPurpose::ResetPassword => 60,
        }
    }
}
