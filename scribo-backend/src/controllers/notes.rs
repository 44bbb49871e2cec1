use actix_web::{HttpRequest, HttpResponse, web};

use crate::AppState;
use crate::db::PinResult;
use crate::error::ApiError;
use crate::middleware::require_user;
use crate::models::{
    CreateNoteRequest, ListNotesQuery, NewNote, NoteChanges, NoteFilter, NotePage, NoteSort,
    TagCount, UpdateNoteRequest,
};
use crate::notes::{MAX_PINNED_NOTES, color_for_tag};
use crate::validation::{normalize_tag, validate_content, validate_tags, validate_title};

pub fn config(cfg: &mut web::ServiceConfig) {
    // Literal segments are registered before /{id}
    cfg.service(
        web::scope("/api/notes")
            .route("", web::get().to(list_notes))
            .route("", web::post().to(create_note))
            .route("/pinned", web::get().to(list_pinned))
            .route("/tags", web::get().to(list_tags))
            .route("/{id}", web::get().to(get_note))
            .route("/{id}", web::put().to(update_note))
            .route("/{id}", web::delete().to(delete_note))
            .route("/{id}/pin", web::post().to(pin_note))
            .route("/{id}/unpin", web::post().to(unpin_note))
            .route("/{id}/archive", web::post().to(archive_note))
            .route("/{id}/unarchive", web::post().to(unarchive_note)),
    );
}

fn filter_from_query(query: &ListNotesQuery) -> Result<NoteFilter, ApiError> {
    let sort = match query.sort.as_deref() {
        Some(s) => NoteSort::from_str(s).ok_or_else(|| {
            ApiError::Validation(format!("Unknown sort '{}': use updated, created or title", s))
        })?,
        None => NoteSort::default(),
    };

    Ok(NoteFilter {
        archived: query.archived.unwrap_or(false),
        tag: query.tag.as_deref().and_then(normalize_tag),
        search: query
            .q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_string),
        sort,
    })
}

async fn list_notes(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<ListNotesQuery>,
) -> Result<HttpResponse, ApiError> {
    let auth = require_user(&state, &req).await?;
    let filter = filter_from_query(&query)?;
    let (page, limit) = (query.page, query.limit);

    let db = state.db.clone();
    let (notes, pagination) =
        web::block(move || db.list_notes(&auth.user.id, &filter, page, limit)).await??;

    Ok(HttpResponse::Ok().json(NotePage { notes, pagination }))
}

async fn list_pinned(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, ApiError> {
    let auth = require_user(&state, &req).await?;
    let db = state.db.clone();
    let notes = web::block(move || db.list_pinned_notes(&auth.user.id)).await??;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "notes": notes,
        "max_pinned": MAX_PINNED_NOTES,
    })))
}

async fn list_tags(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, ApiError> {
    let auth = require_user(&state, &req).await?;
    let db = state.db.clone();
    let tags: Vec<TagCount> = web::block(move || db.list_tags(&auth.user.id))
        .await??
        .into_iter()
        .map(|(tag, count)| TagCount {
            color: color_for_tag(&tag).to_string(),
            tag,
            count,
        })
        .collect();

    Ok(HttpResponse::Ok().json(serde_json::json!({ "tags": tags })))
}

async fn get_note(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let auth = require_user(&state, &req).await?;
    let id = path.into_inner();

    let db = state.db.clone();
    let note = web::block(move || db.get_note(&auth.user.id, &id))
        .await??
        .filter(|note| !note.is_deleted)
        .ok_or_else(ApiError::note_not_found)?;

    Ok(HttpResponse::Ok().json(note))
}

async fn create_note(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<CreateNoteRequest>,
) -> Result<HttpResponse, ApiError> {
    let auth = require_user(&state, &req).await?;
    let body = body.into_inner();

    validate_content(&body.content)?;
    let new_note = NewNote {
        title: validate_title(&body.title)?,
        tags: validate_tags(&body.tags)?,
        content: body.content,
        is_archived: false,
    };

    let db = state.db.clone();
    let user_id = auth.user.id.clone();
    let note = web::block(move || db.insert_note(&user_id, &new_note)).await??;
    log::debug!("[NOTES] User {} created note {}", auth.user.id, note.id);

    Ok(HttpResponse::Created().json(note))
}

async fn update_note(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<UpdateNoteRequest>,
) -> Result<HttpResponse, ApiError> {
    let auth = require_user(&state, &req).await?;
    let id = path.into_inner();
    let body = body.into_inner();

    if let Some(content) = &body.content {
        validate_content(content)?;
    }
    let changes = NoteChanges {
        title: body.title.as_deref().map(validate_title).transpose()?,
        content: body.content,
        tags: body.tags.as_deref().map(validate_tags).transpose()?,
    };
    if changes.is_empty() {
        return Err(ApiError::Validation("No changes provided".to_string()));
    }

    let db = state.db.clone();
    let note = web::block(move || db.update_note(&auth.user.id, &id, &changes))
        .await??
        .ok_or_else(ApiError::note_not_found)?;

    Ok(HttpResponse::Ok().json(note))
}

async fn delete_note(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let auth = require_user(&state, &req).await?;
    let id = path.into_inner();

    let db = state.db.clone();
    let user_id = auth.user.id.clone();
    let note = web::block(move || db.soft_delete_note(&user_id, &id))
        .await??
        .ok_or_else(ApiError::note_not_found)?;
    log::debug!("[NOTES] User {} moved note {} to trash", auth.user.id, note.id);

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Note moved to trash",
        "note": note,
    })))
}

async fn set_pinned(
    state: web::Data<AppState>,
    req: HttpRequest,
    id: String,
    pinned: bool,
) -> Result<HttpResponse, ApiError> {
    let auth = require_user(&state, &req).await?;

    let db = state.db.clone();
    let result =
        web::block(move || db.set_note_pinned(&auth.user.id, &id, pinned, MAX_PINNED_NOTES)).await??;

    match result {
        PinResult::Updated(note) => Ok(HttpResponse::Ok().json(note)),
        PinResult::NotFound => Err(ApiError::note_not_found()),
        PinResult::Archived => Err(ApiError::Conflict(
            "Archived notes cannot be pinned".to_string(),
        )),
        PinResult::LimitReached => Err(ApiError::Conflict(format!(
            "You can pin at most {} notes",
            MAX_PINNED_NOTES
        ))),
    }
}

async fn pin_note(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    set_pinned(state, req, path.into_inner(), true).await
}

async fn unpin_note(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    set_pinned(state, req, path.into_inner(), false).await
}

async fn set_archived(
    state: web::Data<AppState>,
    req: HttpRequest,
    id: String,
    archived: bool,
) -> Result<HttpResponse, ApiError> {
    let auth = require_user(&state, &req).await?;

    let db = state.db.clone();
    let note = web::block(move || db.set_note_archived(&auth.user.id, &id, archived))
        .await??
        .ok_or_else(ApiError::note_not_found)?;

    Ok(HttpResponse::Ok().json(note))
}

async fn archive_note(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    set_archived(state, req, path.into_inner(), true).await
}

async fn unarchive_note(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    set_archived(state, req, path.into_inner(), false).await
}
