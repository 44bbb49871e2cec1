use actix_web::{HttpRequest, HttpResponse, web};
use chrono::Utc;

use crate::AppState;
use crate::error::ApiError;
use crate::middleware::require_user;
use crate::models::{NotePage, PageQuery, TrashedNote};
use crate::notes::days_remaining;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/trash")
            .route("", web::get().to(list_trash))
            .route("", web::delete().to(empty_trash))
            .route("/{id}/restore", web::post().to(restore_note))
            .route("/{id}", web::delete().to(delete_permanently)),
    );
}

async fn list_trash(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let auth = require_user(&state, &req).await?;
    let (page, limit) = (query.page, query.limit);

    let db = state.db.clone();
    let (notes, pagination) = web::block(move || db.list_trash(&auth.user.id, page, limit)).await??;

    let now = Utc::now();
    let notes = notes
        .into_iter()
        .map(|note| TrashedNote {
            days_remaining: days_remaining(note.deleted_at.unwrap_or(now), now),
            note,
        })
        .collect();

    Ok(HttpResponse::Ok().json(NotePage { notes, pagination }))
}

async fn restore_note(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let auth = require_user(&state, &req).await?;
    let id = path.into_inner();

    let db = state.db.clone();
    let note = web::block(move || db.restore_note(&auth.user.id, &id))
        .await??
        .ok_or_else(ApiError::note_not_found)?;

    Ok(HttpResponse::Ok().json(note))
}

async fn delete_permanently(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let auth = require_user(&state, &req).await?;
    let id = path.into_inner();

    let db = state.db.clone();
    let user_id = auth.user.id.clone();
    let note_id = id.clone();
    if !web::block(move || db.delete_note_permanently(&user_id, &note_id)).await?? {
        return Err(ApiError::note_not_found());
    }
    log::info!("[TRASH] User {} permanently deleted note {}", auth.user.id, id);

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Note permanently deleted"
    })))
}

async fn empty_trash(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, ApiError> {
    let auth = require_user(&state, &req).await?;

    let db = state.db.clone();
    let user_id = auth.user.id.clone();
    let deleted = web::block(move || db.empty_trash(&user_id)).await??;
    log::info!("[TRASH] User {} emptied trash ({} notes)", auth.user.id, deleted);

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Trash emptied",
        "deleted": deleted,
    })))
}
