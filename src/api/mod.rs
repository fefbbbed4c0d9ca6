//! HTTP interface for chatvault
//!
//! Thin axum layer over the conversation manager: handlers translate
//! request bodies and path parameters into manager calls and map the
//! error taxonomy onto status codes. No business rules live here.

use crate::error::ChatvaultError;
use crate::manager::{ChatRequest, ConversationManager};
use crate::providers::ChatProvider;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Application state shared across routes
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<ConversationManager>,
    pub provider: Arc<dyn ChatProvider>,
}

/// Create the router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/conversations", get(list_conversations))
        .route("/api/conversations/new", post(new_conversation))
        .route("/api/history/:session_id", get(get_history))
        .route("/api/conversations/:session_id/title", put(update_title))
        .route("/api/conversations/:session_id", delete(delete_conversation))
        .route("/api/clear-history", post(clear_history))
        .route("/api/model-info", get(model_info))
        .route("/api/system-message", get(system_message))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Error translated onto an HTTP status code
///
/// Validation maps to 400, unknown sessions to 404, store and provider
/// failures to 500. Bodies are always `{"error": <message>}`.
pub struct ApiError(anyhow::Error);

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        Self(ChatvaultError::NotFound(message.into()).into())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.downcast_ref::<ChatvaultError>() {
            Some(ChatvaultError::Validation(_)) => StatusCode::BAD_REQUEST,
            Some(ChatvaultError::NotFound(_)) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Request failed: {:#}", self.0);
        }

        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

/// Body of POST /api/conversations/new
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct NewConversationRequest {
    #[serde(default)]
    title: Option<String>,
}

/// Body of PUT /api/conversations/:session_id/title
#[derive(Debug, Deserialize)]
struct UpdateTitleRequest {
    title: String,
}

/// Body of POST /api/clear-history
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClearHistoryRequest {
    session_id: String,
}

/// POST /api/chat - process one chat turn
async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let response = state.manager.chat(state.provider.as_ref(), request).await?;
    Ok(Json(serde_json::json!({
        "reply": response.reply,
        "sessionId": response.session_id,
    })))
}

/// GET /api/conversations - list previews, most recently active first
async fn list_conversations(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let conversations = state.manager.list_conversations()?;
    Ok(Json(serde_json::json!({ "conversations": conversations })))
}

/// POST /api/conversations/new - start an empty conversation
async fn new_conversation(
    State(state): State<AppState>,
    body: Option<Json<NewConversationRequest>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let session_id = state.manager.start_conversation(request.title.as_deref())?;
    Ok(Json(serde_json::json!({ "sessionId": session_id })))
}

/// GET /api/history/:session_id - full stored history
async fn get_history(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<crate::store::ConversationHistory>, ApiError> {
    Ok(Json(state.manager.get_history(&session_id)?))
}

/// PUT /api/conversations/:session_id/title - rename a conversation
async fn update_title(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<UpdateTitleRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !state.manager.update_title(&session_id, &request.title).await? {
        return Err(ApiError::not_found("Conversation not found"));
    }
    Ok(Json(serde_json::json!({ "success": true })))
}

/// DELETE /api/conversations/:session_id - delete a conversation
async fn delete_conversation(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !state.manager.delete_conversation(&session_id)? {
        return Err(ApiError::not_found("Conversation not found"));
    }
    Ok(Json(serde_json::json!({ "success": true })))
}

/// POST /api/clear-history - empty a conversation's messages
async fn clear_history(
    State(state): State<AppState>,
    Json(request): Json<ClearHistoryRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !state.manager.clear_messages(&request.session_id).await? {
        return Err(ApiError::not_found("Conversation not found"));
    }
    Ok(Json(serde_json::json!({ "success": true })))
}

/// GET /api/model-info - active model name
async fn model_info(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "model": state.provider.model() }))
}

/// GET /api/system-message - default system message
async fn system_message(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "systemMessage": state.manager.default_system_message()
    }))
}
