//! Bearer-token authentication for protected routes

use actix_web::{HttpRequest, web};

use crate::AppState;
use crate::db::hash_token;
use crate::error::ApiError;
use crate::models::User;

/// The authenticated caller
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
    /// Digest of the presented token, used to keep or revoke this session
    pub token_hash: String,
}

/// Raw bearer token from the Authorization header
pub fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Resolve the caller from the request, or fail with 401
pub async fn require_user(state: &web::Data<AppState>, req: &HttpRequest) -> Result<AuthUser, ApiError> {
    let token = bearer_token(req)
        .ok_or_else(|| ApiError::Unauthorized("No authorization token provided".to_string()))?;
    let token_hash = hash_token(&token);

    let user_id = match state.sessions.get(&token_hash) {
        Some(user_id) => user_id,
        None => {
            let db = state.db.clone();
            let ttl = state.config.session_ttl_hours;
            let hash = token_hash.clone();
            let session = web::block(move || db.validate_session(&hash, ttl)).await??;
            let session = session
                .ok_or_else(|| ApiError::Unauthorized("Invalid or expired session".to_string()))?;
            state.sessions.insert(&token_hash, &session.user_id);
            session.user_id
        }
    };

    let db = state.db.clone();
    let user = web::block(move || db.get_user(&user_id)).await??;
    let Some(user) = user else {
        state.sessions.invalidate(&token_hash);
        return Err(ApiError::Unauthorized("Invalid or expired session".to_string()));
    };

    Ok(AuthUser { user, token_hash })
}
