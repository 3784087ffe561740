//! REST endpoints for the dashboard and chat views.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::debug;

use super::session::ChatSession;
use crate::error::SessionError;
use crate::profile::DashboardSummary;

/// Shared state for assistant routes.
#[derive(Clone)]
pub struct AssistantRouteState {
    pub session: Arc<ChatSession>,
}

#[derive(Debug, Deserialize)]
struct OpenChatBody {
    #[serde(default)]
    draft: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SendBody {
    content: String,
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        let status = match self {
            SessionError::Busy => StatusCode::CONFLICT,
            SessionError::EmptyMessage => StatusCode::BAD_REQUEST,
        };
        (status, Json(serde_json::json!({"error": self.to_string()}))).into_response()
    }
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "aura-assist"
    }))
}

/// GET /api/profile
async fn get_profile(State(state): State<AssistantRouteState>) -> impl IntoResponse {
    Json(state.session.profiles().snapshot().await)
}

/// GET /api/dashboard
async fn get_dashboard(State(state): State<AssistantRouteState>) -> impl IntoResponse {
    let profile = state.session.profiles().snapshot().await;
    Json(DashboardSummary::from_profile(&profile))
}

/// GET /api/chat
///
/// Current view, loading flag, draft and transcript.
async fn get_chat(State(state): State<AssistantRouteState>) -> impl IntoResponse {
    Json(state.session.snapshot().await)
}

/// POST /api/chat/open
async fn open_chat(
    State(state): State<AssistantRouteState>,
    body: Option<Json<OpenChatBody>>,
) -> impl IntoResponse {
    let draft = body.and_then(|Json(body)| body.draft);
    state.session.enter_chat(draft).await;
    Json(state.session.snapshot().await)
}

/// POST /api/chat/close
async fn close_chat(State(state): State<AssistantRouteState>) -> impl IntoResponse {
    state.session.leave_chat().await;
    Json(state.session.snapshot().await)
}

/// POST /api/chat/messages
///
/// Sends one user turn and returns the assistant turn. 409 while another
/// send is in flight, 400 for an empty message.
async fn send_message(
    State(state): State<AssistantRouteState>,
    Json(body): Json<SendBody>,
) -> Result<impl IntoResponse, SessionError> {
    debug!(chars = body.content.len(), "Chat message received");
    let reply = state.session.send(&body.content).await?;
    Ok(Json(serde_json::json!({ "reply": reply })))
}

/// Build the assistant REST routes.
pub fn assistant_routes(state: AssistantRouteState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/profile", get(get_profile))
        .route("/api/dashboard", get(get_dashboard))
        .route("/api/chat", get(get_chat))
        .route("/api/chat/open", post(open_chat))
        .route("/api/chat/close", post(close_chat))
        .route("/api/chat/messages", post(send_message))
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
        .with_state(state)
}
