//! Registration, login and account-recovery endpoints

use actix_web::{HttpRequest, HttpResponse, web};

use crate::AppState;
use crate::error::ApiError;
use crate::middleware::require_user;
use crate::models::{
    AuthResponse, ForgotPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest,
    TokenPurpose, User, VerifyEmailRequest,
};
use crate::password::{dummy_password_hash, hash_password, verify_password};
use crate::validation::{validate_email, validate_name, validate_password};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/auth")
            .route("/register", web::post().to(register))
            .route("/login", web::post().to(login))
            .route("/logout", web::post().to(logout))
            .route("/me", web::get().to(me))
            .route("/verify-email", web::post().to(verify_email))
            .route("/resend-verification", web::post().to(resend_verification))
            .route("/forgot-password", web::post().to(forgot_password))
            .route("/reset-password", web::post().to(reset_password)),
    );
}

/// Hash off the async executor; Argon2 is deliberately slow
pub(crate) async fn hash_blocking(password: String) -> Result<String, ApiError> {
    web::block(move || hash_password(&password))
        .await?
        .map_err(|e| ApiError::Internal(e.to_string()))
}

pub(crate) async fn verify_blocking(password: String, password_hash: String) -> Result<bool, ApiError> {
    Ok(web::block(move || verify_password(&password, &password_hash)).await?)
}

/// Start a session for `user` and build the login/register response
async fn start_session(state: &web::Data<AppState>, user: User) -> Result<AuthResponse, ApiError> {
    let db = state.db.clone();
    let ttl = state.config.session_ttl_hours;
    let user_id = user.id.clone();
    let (token, session) = web::block(move || db.create_session(&user_id, ttl)).await??;

    Ok(AuthResponse {
        token,
        expires_at: session.expires_at,
        user: user.to_response(&state.config.self_url()),
    })
}

/// Email delivery is not wired up; links go to the log instead
async fn send_token_link(
    state: &web::Data<AppState>,
    user: &User,
    purpose: TokenPurpose,
) -> Result<(), ApiError> {
    let db = state.db.clone();
    let user_id = user.id.clone();
    let token = web::block(move || db.issue_one_time_token(&user_id, purpose)).await??;

    let path = match purpose {
        TokenPurpose::VerifyEmail => "verify-email",
        TokenPurpose::ResetPassword => "reset-password",
    };
    log::info!(
        "[AUTH] {} link for {}: {}/{}?token={}",
        purpose.as_str(),
        user.email,
        state.config.self_url(),
        path,
        token
    );
    Ok(())
}

async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    let name = validate_name(&body.name)?;
    let email = validate_email(&body.email)?;
    validate_password(&body.password)?;

    let password_hash = hash_blocking(body.password).await?;

    let db = state.db.clone();
    let (n, e) = (name.clone(), email.clone());
    let user = match web::block(move || db.create_user(&n, &e, &password_hash)).await? {
        Ok(user) => user,
        Err(err) if err.is_constraint_violation() => {
            return Err(ApiError::Conflict("Email is already registered".to_string()));
        }
        Err(err) => return Err(err.into()),
    };
    log::info!("[AUTH] Registered user {} ({})", user.id, user.email);

    send_token_link(&state, &user, TokenPurpose::VerifyEmail).await?;
    let response = start_session(&state, user).await?;

    Ok(HttpResponse::Created().json(response))
}

async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    let email = body.email.trim().to_lowercase();

    let db = state.db.clone();
    let Some(user) = web::block(move || db.get_user_by_email(&email)).await?? else {
        // Unknown emails pay for one Argon2 verification, same as a wrong password
        verify_blocking(body.password, dummy_password_hash().to_string()).await?;
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    };

    if !verify_blocking(body.password, user.password_hash.clone()).await? {
        log::debug!("[AUTH] Failed login for {}", user.email);
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    if state.config.require_email_verification && !user.email_verified {
        return Err(ApiError::Forbidden(
            "Please verify your email address before logging in".to_string(),
        ));
    }

    log::info!("[AUTH] User {} logged in", user.id);
    Ok(HttpResponse::Ok().json(start_session(&state, user).await?))
}

async fn logout(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, ApiError> {
    let auth = require_user(&state, &req).await?;

    let db = state.db.clone();
    let hash = auth.token_hash.clone();
    web::block(move || db.delete_session(&hash)).await??;
    state.sessions.invalidate(&auth.token_hash);

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Logged out"
    })))
}

async fn me(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, ApiError> {
    let auth = require_user(&state, &req).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "user": auth.user.to_response(&state.config.self_url())
    })))
}

async fn verify_email(
    state: web::Data<AppState>,
    body: web::Json<VerifyEmailRequest>,
) -> Result<HttpResponse, ApiError> {
    let token = body.into_inner().token;

    let db = state.db.clone();
    let verified = web::block(move || -> Result<bool, crate::db::DbError> {
        match db.consume_one_time_token(&token, TokenPurpose::VerifyEmail)? {
            Some(user_id) => db.mark_email_verified(&user_id),
            None => Ok(false),
        }
    })
    .await??;

    if !verified {
        return Err(ApiError::Validation(
            "Invalid or expired verification token".to_string(),
        ));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Email verified"
    })))
}

async fn resend_verification(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let auth = require_user(&state, &req).await?;
    if auth.user.email_verified {
        return Err(ApiError::Conflict("Email is already verified".to_string()));
    }

    send_token_link(&state, &auth.user, TokenPurpose::VerifyEmail).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Verification email sent"
    })))
}

async fn forgot_password(
    state: web::Data<AppState>,
    body: web::Json<ForgotPasswordRequest>,
) -> Result<HttpResponse, ApiError> {
    let email = body.into_inner().email.trim().to_lowercase();

    let db = state.db.clone();
    if let Some(user) = web::block(move || db.get_user_by_email(&email)).await?? {
        send_token_link(&state, &user, TokenPurpose::ResetPassword).await?;
    }

    // Same answer whether or not the account exists
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "If that email is registered, a reset link has been sent"
    })))
}

async fn reset_password(
    state: web::Data<AppState>,
    body: web::Json<ResetPasswordRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validate_password(&body.password)?;

    let db = state.db.clone();
    let token = body.token;
    let user_id = web::block(move || db.consume_one_time_token(&token, TokenPurpose::ResetPassword))
        .await??
        .ok_or_else(|| ApiError::Validation("Invalid or expired reset token".to_string()))?;

    let password_hash = hash_blocking(body.password).await?;

    let db = state.db.clone();
    let uid = user_id.clone();
    web::block(move || -> Result<(), crate::db::DbError> {
        db.set_user_password_hash(&uid, &password_hash)?;
        db.delete_user_sessions(&uid, None)?;
        Ok(())
    })
    .await??;
    state.sessions.invalidate_all();

    log::info!("[AUTH] Password reset for user {}", user_id);
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Password has been reset"
    })))
}
