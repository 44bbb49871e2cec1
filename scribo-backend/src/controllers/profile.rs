use actix_multipart::Multipart;
use actix_web::{HttpRequest, HttpResponse, web};
use futures_util::StreamExt;
use std::path::Path;

use super::auth::{hash_blocking, verify_blocking};
use crate::AppState;
use crate::error::ApiError;
use crate::middleware::require_user;
use crate::models::{ChangePasswordRequest, DeleteAccountRequest, UpdateProfileRequest};
use crate::validation::{validate_bio, validate_name, validate_password};

/// Maximum avatar upload size
const MAX_AVATAR_SIZE: usize = 2 * 1024 * 1024;
const AVATAR_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/profile")
            .route("", web::get().to(get_profile))
            .route("", web::put().to(update_profile))
            .route("", web::delete().to(delete_account))
            .route("/stats", web::get().to(get_stats))
            .route("/avatar", web::post().to(upload_avatar))
            .route("/avatar", web::delete().to(delete_avatar))
            .route("/password", web::put().to(change_password)),
    );
}

/// Lowercased extension if the file name is an accepted image type
fn avatar_extension(file_name: &str) -> Option<String> {
    let ext = Path::new(file_name).extension()?.to_str()?.to_lowercase();
    AVATAR_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

async fn remove_avatar_file(state: &AppState, file_name: &str) {
    let path = state.config.avatars_dir().join(file_name);
    if let Err(e) = tokio::fs::remove_file(&path).await {
        log::warn!("Failed to remove avatar {:?}: {}", path, e);
    }
}

/// Write the image and point the user at it, removing the replaced file.
/// The new file is deleted again if the database update fails.
async fn store_avatar(
    state: &AppState,
    user_id: &str,
    ext: &str,
    data: &[u8],
) -> Result<String, ApiError> {
    let file_name = format!("{}-{}.{}", user_id, uuid::Uuid::new_v4().simple(), ext);
    let path = state.config.avatars_dir().join(&file_name);
    tokio::fs::write(&path, data)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to store avatar: {}", e)))?;

    let db = state.db.clone();
    let owner = user_id.to_string();
    let stored = file_name.clone();
    let updated = match web::block(move || db.set_user_avatar(&owner, Some(&stored))).await {
        Ok(result) => result.map_err(ApiError::from),
        Err(e) => Err(ApiError::from(e)),
    };
    let previous = match updated {
        Ok(previous) => previous,
        Err(e) => {
            remove_avatar_file(state, &file_name).await;
            return Err(e);
        }
    };

    if let Some(previous) = previous {
        remove_avatar_file(state, &previous).await;
    }
    Ok(file_name)
}

async fn get_profile(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, ApiError> {
    let auth = require_user(&state, &req).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "user": auth.user.to_response(&state.config.self_url())
    })))
}

async fn update_profile(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse, ApiError> {
    let auth = require_user(&state, &req).await?;
    let body = body.into_inner();

    let name = body.name.as_deref().map(validate_name).transpose()?;
    let bio = body.bio.as_deref().map(validate_bio).transpose()?;
    if name.is_none() && bio.is_none() {
        return Err(ApiError::Validation("No changes provided".to_string()));
    }

    let db = state.db.clone();
    let user = web::block(move || {
        db.update_user_profile(
            &auth.user.id,
            name.as_deref(),
            bio.as_ref().map(|b| b.as_deref()),
        )
    })
    .await??
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "user": user.to_response(&state.config.self_url())
    })))
}

async fn get_stats(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, ApiError> {
    let auth = require_user(&state, &req).await?;
    let db = state.db.clone();
    let stats = web::block(move || db.note_stats(&auth.user.id)).await??;
    Ok(HttpResponse::Ok().json(stats))
}

async fn upload_avatar(
    state: web::Data<AppState>,
    req: HttpRequest,
    mut payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let auth = require_user(&state, &req).await?;

    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| ApiError::Validation(format!("Failed to process multipart: {}", e)))?;
        if field.name() != "avatar" {
            continue;
        }

        let ext = field
            .content_disposition()
            .get_filename()
            .and_then(avatar_extension)
            .ok_or_else(|| {
                ApiError::Validation("Avatar must be a png, jpg, gif or webp image".to_string())
            })?;

        let mut data: Vec<u8> = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk =
                chunk.map_err(|e| ApiError::Validation(format!("Failed to read upload: {}", e)))?;
            data.extend_from_slice(&chunk);
            if data.len() > MAX_AVATAR_SIZE {
                return Err(ApiError::PayloadTooLarge(
                    "Avatar cannot exceed 2MB".to_string(),
                ));
            }
        }
        upload = Some((ext, data));
    }

    let Some((ext, data)) = upload else {
        return Err(ApiError::Validation("No avatar file provided".to_string()));
    };
    if data.is_empty() {
        return Err(ApiError::Validation("Avatar file is empty".to_string()));
    }

    let file_name = store_avatar(&state, &auth.user.id, &ext, &data).await?;
    log::info!("User {} uploaded avatar {}", auth.user.id, file_name);

    let mut user = auth.user;
    user.avatar = Some(file_name);
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "user": user.to_response(&state.config.self_url())
    })))
}

async fn delete_avatar(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, ApiError> {
    let auth = require_user(&state, &req).await?;

    let db = state.db.clone();
    let user_id = auth.user.id.clone();
    let previous = web::block(move || db.set_user_avatar(&user_id, None)).await??;
    if let Some(previous) = previous {
        remove_avatar_file(&state, &previous).await;
    }

    let mut user = auth.user;
    user.avatar = None;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "user": user.to_response(&state.config.self_url())
    })))
}

async fn change_password(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<ChangePasswordRequest>,
) -> Result<HttpResponse, ApiError> {
    let auth = require_user(&state, &req).await?;
    let body = body.into_inner();

    if !verify_blocking(body.current_password, auth.user.password_hash.clone()).await? {
        return Err(ApiError::Unauthorized("Current password is incorrect".to_string()));
    }
    validate_password(&body.new_password)?;
    let password_hash = hash_blocking(body.new_password).await?;

    let db = state.db.clone();
    let user_id = auth.user.id.clone();
    let keep = auth.token_hash.clone();
    let revoked = web::block(move || -> Result<usize, crate::db::DbError> {
        db.set_user_password_hash(&user_id, &password_hash)?;
        db.delete_user_sessions(&user_id, Some(&keep))
    })
    .await??;
    state.sessions.invalidate_all();
    log::info!(
        "User {} changed password, revoked {} other session(s)",
        auth.user.id,
        revoked
    );

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Password updated"
    })))
}

async fn delete_account(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<DeleteAccountRequest>,
) -> Result<HttpResponse, ApiError> {
    let auth = require_user(&state, &req).await?;

    if !verify_blocking(body.into_inner().password, auth.user.password_hash.clone()).await? {
        return Err(ApiError::Unauthorized("Password is incorrect".to_string()));
    }

    let db = state.db.clone();
    let user_id = auth.user.id.clone();
    web::block(move || db.delete_user(&user_id)).await??;
    state.sessions.invalidate_all();
    if let Some(avatar) = &auth.user.avatar {
        remove_avatar_file(&state, avatar).await;
    }
    log::info!("User {} deleted their account", auth.user.id);

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Account deleted"
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, initialize_data_dirs};
    use crate::db::Database;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn test_avatar_extension() {
        assert_eq!(avatar_extension("me.PNG").as_deref(), Some("png"));
        assert_eq!(avatar_extension("photo.jpeg").as_deref(), Some("jpeg"));
        assert!(avatar_extension("script.svg").is_none());
        assert!(avatar_extension("noext").is_none());
        assert!(avatar_extension("../../etc/passwd").is_none());
    }

    #[actix_web::test]
    async fn test_failed_avatar_update_removes_new_file() {
        let dir = tempdir().unwrap();
        let config = Config {
            database_url: dir.path().join("scribo.db").to_string_lossy().to_string(),
            data_dir: dir.path().join("data"),
            ..Config::default()
        };
        initialize_data_dirs(&config).unwrap();
        let db = Arc::new(Database::new(&config.database_url).unwrap());
        db.conn().unwrap().execute_batch("DROP TABLE users;").unwrap();
        let state = AppState::new(db, config.clone(), None);

        let err = store_avatar(&state, "user-1", "png", b"not really a png")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Database(_)));
        assert_eq!(std::fs::read_dir(config.avatars_dir()).unwrap().count(), 0);
    }
}
