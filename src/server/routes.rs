// The relay's HTTP surface: one endpoint per action family.
//
// Handlers are thin: validate the request, build the prompt, hand the
// gateway's fragment stream to the encoder. Service handles are explicit
// constructor-injected state; nothing here reaches for a global.

use crate::core::ai::GenerationGateway;
use crate::core::calendar::{CalendarActionService, CalendarApi, EVENT_TIME_ZONE};
use crate::core::chat::{Message, TranscriptStore};
use crate::core::document::DocumentTextExtractor;
use crate::core::prompt::{ComposeContext, PromptRequest};
use crate::server::error::ApiError;
use crate::server::streaming;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Request body ceiling, matching the original deployment's 50 MB limit.
const BODY_LIMIT_BYTES: usize = 50 * 1024 * 1024;

pub type DynGateway = Arc<dyn GenerationGateway>;
pub type DynCalendarApi = Arc<dyn CalendarApi>;
pub type DynTranscriptStore = Arc<dyn TranscriptStore>;
pub type DynExtractor = Arc<dyn DocumentTextExtractor>;
pub type CalendarActions = CalendarActionService<DynGateway, DynCalendarApi>;

/// Service handles shared by every handler. Built once in the composition
/// root and reused for the process lifetime.
#[derive(Clone)]
pub struct AppState {
    pub gateway: DynGateway,
    pub transcripts: DynTranscriptStore,
    pub calendar_actions: Arc<CalendarActions>,
    pub extractor: DynExtractor,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/action", post(action))
        .route("/api/save_chat", post(save_chat))
        .route("/api/summarize-pdf", post(summarize_pdf))
        .route("/api/compose", post(compose))
        .route("/api/analyze-text", post(analyze_text))
        .route("/api/create-event", post(create_event))
        .route("/api/get-events", post(get_events))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Rejects absent and empty fields alike, mirroring the original's falsy
/// checks.
fn required(field: Option<String>, message: &str) -> Result<String, ApiError> {
    field
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::validation(message))
}

/// Builds the prompt and relays the gateway's fragment stream.
async fn relay_stream(state: &AppState, request: PromptRequest) -> Response {
    let prompt = request.build();

    match state.gateway.stream_generate(&prompt).await {
        Ok(fragments) => streaming::stream_response(fragments),
        Err(err) => {
            tracing::error!("Error during AI stream: {err}");
            streaming::stream_failure_response()
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    message: Option<String>,
    context: Option<String>,
}

async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Response, ApiError> {
    let message = required(req.message, "Message is required")?;
    Ok(relay_stream(&state, PromptRequest::chat(message, req.context)).await)
}

#[derive(Debug, Deserialize)]
struct ActionRequest {
    action: Option<String>,
    text: Option<String>,
}

async fn action(
    State(state): State<AppState>,
    Json(req): Json<ActionRequest>,
) -> Result<Response, ApiError> {
    let action = required(req.action, "Action and text are required")?;
    let text = required(req.text, "Action and text are required")?;

    let request = PromptRequest::action(&action, text)
        .map_err(|_| ApiError::validation("Invalid action"))?;
    Ok(relay_stream(&state, request).await)
}

#[derive(Debug, Deserialize)]
struct SaveChatRequest {
    #[serde(rename = "userId")]
    user_id: Option<String>,
    messages: Option<Vec<Message>>,
}

async fn save_chat(
    State(state): State<AppState>,
    Json(req): Json<SaveChatRequest>,
) -> Result<Response, ApiError> {
    let user_id = required(req.user_id, "User ID and messages are required")?;
    let messages = req
        .messages
        .ok_or_else(|| ApiError::validation("User ID and messages are required"))?;

    match state.transcripts.upsert(&user_id, &messages).await {
        Ok(()) => Ok(Json(json!({ "success": true, "message": "Chat saved." })).into_response()),
        Err(err) => {
            // Persistence is best-effort for the caller; the details stay
            // in the log.
            tracing::error!("Error saving chat: {err}");
            Ok((
                axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": "Failed to save chat history." })),
            )
                .into_response())
        }
    }
}

async fn summarize_pdf(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut document: Option<Vec<u8>> = None;

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        tracing::error!("Error processing PDF: {err}");
        ApiError::upstream("Failed to summarize PDF.")
    })? {
        if field.name() == Some("pdf") {
            let bytes = field.bytes().await.map_err(|err| {
                tracing::error!("Error processing PDF: {err}");
                ApiError::upstream("Failed to summarize PDF.")
            })?;
            document = Some(bytes.to_vec());
            break;
        }
    }

    let document = document.ok_or_else(|| ApiError::validation("No PDF file uploaded."))?;

    let text = state.extractor.extract_text(&document).map_err(|err| {
        tracing::error!("Error processing PDF: {err}");
        ApiError::upstream("Failed to summarize PDF.")
    })?;

    Ok(relay_stream(&state, PromptRequest::document_summary(text)).await)
}

#[derive(Debug, Deserialize)]
struct ComposeRequest {
    template: Option<String>,
    context: Option<ComposeContext>,
}

async fn compose(
    State(state): State<AppState>,
    Json(req): Json<ComposeRequest>,
) -> Result<Response, ApiError> {
    let template = required(req.template, "Template and context are required.")?;
    let context = req
        .context
        .ok_or_else(|| ApiError::validation("Template and context are required."))?;

    let request = PromptRequest::compose(&template, context)
        .map_err(|_| ApiError::validation("Invalid template type."))?;
    Ok(relay_stream(&state, request).await)
}

#[derive(Debug, Deserialize)]
struct AnalyzeRequest {
    question: Option<String>,
    context: Option<String>,
}

async fn analyze_text(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Response, ApiError> {
    let question = required(req.question, "Question and context are required.")?;
    let context = required(req.context, "Question and context are required.")?;
    Ok(relay_stream(&state, PromptRequest::analyze(question, context)).await)
}

#[derive(Debug, Deserialize)]
struct CreateEventRequest {
    token: Option<String>,
    text: Option<String>,
}

async fn create_event(
    State(state): State<AppState>,
    Json(req): Json<CreateEventRequest>,
) -> Result<Response, ApiError> {
    let token = required(req.token, "Auth token and text are required")?;
    let text = required(req.text, "Auth token and text are required")?;

    let today = Utc::now().with_timezone(&EVENT_TIME_ZONE).date_naive();

    match state
        .calendar_actions
        .create_from_text(&token, &text, today)
        .await
    {
        Ok(message) => Ok(Json(json!({ "success": true, "message": message })).into_response()),
        Err(err) => {
            tracing::error!("Error creating Google Calendar event: {err}");
            Err(ApiError::upstream("Failed to create event."))
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListEventsRequest {
    token: Option<String>,
}

async fn get_events(
    State(state): State<AppState>,
    Json(req): Json<ListEventsRequest>,
) -> Result<Response, ApiError> {
    let token = required(req.token, "Auth token is required.")?;

    match state.calendar_actions.upcoming_events(&token).await {
        Ok(items) => Ok(Json(items).into_response()),
        Err(err) => {
            tracing::error!("Error fetching Google Calendar events: {err}");
            Err(ApiError::upstream("Failed to fetch events."))
        }
    }
}
