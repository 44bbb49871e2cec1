use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{HttpRequest, HttpResponse, web};
use serde::Deserialize;

use crate::AppState;
use crate::error::ApiError;
use crate::middleware::require_user;
use crate::notes::export::{ExportFormat, ImportNote, to_markdown, validate_import};

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/export").route(web::get().to(export_notes)));
    cfg.service(web::resource("/api/import").route(web::post().to(import_notes)));
}

#[derive(Debug, Deserialize)]
struct ExportQuery {
    format: Option<String>,
}

async fn export_notes(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<ExportQuery>,
) -> Result<HttpResponse, ApiError> {
    let auth = require_user(&state, &req).await?;
    let format = match query.format.as_deref() {
        Some(f) => f.parse::<ExportFormat>().map_err(|_| {
            ApiError::Validation(format!("Unknown export format '{}': use json or markdown", f))
        })?,
        None => ExportFormat::default(),
    };

    let db = state.db.clone();
    let user_id = auth.user.id.clone();
    let notes = web::block(move || db.export_notes(&user_id)).await??;
    log::info!(
        "[NOTES] User {} exported {} notes as {}",
        auth.user.id,
        notes.len(),
        format.as_ref()
    );

    let body = match format {
        ExportFormat::Json => serde_json::to_string_pretty(&notes)
            .map_err(|e| ApiError::Internal(format!("Failed to serialize export: {}", e)))?,
        ExportFormat::Markdown => to_markdown(&notes),
    };

    Ok(HttpResponse::Ok()
        .content_type(format.content_type())
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(format.file_name().to_string())],
        })
        .body(body))
}

async fn import_notes(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<Vec<ImportNote>>,
) -> Result<HttpResponse, ApiError> {
    let auth = require_user(&state, &req).await?;
    let notes = validate_import(body.into_inner())?;

    let db = state.db.clone();
    let user_id = auth.user.id.clone();
    let imported = web::block(move || db.insert_notes(&user_id, &notes)).await??;
    log::info!("[NOTES] User {} imported {} notes", auth.user.id, imported);

    Ok(HttpResponse::Created().json(serde_json::json!({
        "imported": imported
    })))
}
