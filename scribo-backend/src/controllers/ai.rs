//! AI text actions. All intelligence lives in the provider; these handlers
//! validate input, enforce the per-user rate limit and relay the result.

use actix_web::{HttpRequest, HttpResponse, web};
use serde::Deserialize;

use crate::AppState;
use crate::ai::actions::{InputError, MAX_INPUT_CHARS, parse_tag_suggestions, prepare_input};
use crate::ai::{AiAction, SummaryLength, Tone};
use crate::error::ApiError;
use crate::middleware::require_user;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/ai")
            .route("/status", web::get().to(status))
            .route("/grammar", web::post().to(grammar))
            .route("/summarize", web::post().to(summarize))
            .route("/tags", web::post().to(suggest_tags))
            .route("/tone", web::post().to(change_tone))
            .route("/generate", web::post().to(generate)),
    );
}

#[derive(Debug, Deserialize)]
struct TextRequest {
    text: String,
}

#[derive(Debug, Deserialize)]
struct SummarizeRequest {
    text: String,
    #[serde(default)]
    length: SummaryLength,
}

#[derive(Debug, Deserialize)]
struct ToneRequest {
    text: String,
    tone: Tone,
}

#[derive(Debug, Deserialize)]
struct GenerateRequest {
    prompt: String,
}

/// Authenticate, validate and rate-limit, then call the provider
async fn run_action(
    state: &web::Data<AppState>,
    req: &HttpRequest,
    action: AiAction,
    raw_input: &str,
) -> Result<String, ApiError> {
    let auth = require_user(state, req).await?;

    let backend = state
        .ai
        .clone()
        .ok_or_else(|| ApiError::Unavailable("AI features are not configured".to_string()))?;

    let input = prepare_input(raw_input).map_err(|e| match e {
        InputError::Empty => ApiError::Validation("Text is required".to_string()),
        InputError::TooLong => ApiError::PayloadTooLarge(format!(
            "Text cannot exceed {} characters",
            MAX_INPUT_CHARS
        )),
    })?;

    if !state.ai_limiter.check(&auth.user.id) {
        return Err(ApiError::RateLimited(
            "Too many AI requests, please wait a minute".to_string(),
        ));
    }

    log::debug!(
        "[AI] {} for user {} ({} chars)",
        action.name(),
        auth.user.id,
        input.chars().count()
    );
    backend
        .complete(&action.system_prompt(), &input)
        .await
        .map_err(|e| {
            log::error!("[AI] {} failed: {}", action.name(), e);
            ApiError::Upstream("AI provider request failed".to_string())
        })
}

fn result_response(result: String) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "result": result }))
}

async fn status(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "configured": state.ai.is_some(),
        "model": state.ai.as_ref().map(|b| b.model_name().to_string()),
        "rate_limit_per_minute": state.config.ai.rate_limit_per_minute,
    }))
}

async fn grammar(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<TextRequest>,
) -> Result<HttpResponse, ApiError> {
    let result = run_action(&state, &req, AiAction::Grammar, &body.text).await?;
    Ok(result_response(result))
}

async fn summarize(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<SummarizeRequest>,
) -> Result<HttpResponse, ApiError> {
    let result = run_action(&state, &req, AiAction::Summarize(body.length), &body.text).await?;
    Ok(result_response(result))
}

async fn suggest_tags(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<TextRequest>,
) -> Result<HttpResponse, ApiError> {
    let result = run_action(&state, &req, AiAction::Tags, &body.text).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "tags": parse_tag_suggestions(&result)
    })))
}

async fn change_tone(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<ToneRequest>,
) -> Result<HttpResponse, ApiError> {
    let result = run_action(&state, &req, AiAction::Tone(body.tone), &body.text).await?;
    Ok(result_response(result))
}

async fn generate(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<GenerateRequest>,
) -> Result<HttpResponse, ApiError> {
    let result = run_action(&state, &req, AiAction::Generate, &body.prompt).await?;
    Ok(result_response(result))
}
