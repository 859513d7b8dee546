// SPDX-License-Identifier: MIT

//! Survey chat routes.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::Message;
use crate::AppState;
use axum::{
    extract::State,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// How many messages `/api/survey/recent` returns.
const RECENT_MESSAGE_COUNT: usize = 5;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/survey", post(survey_turn).get(get_survey))
        .route("/api/survey/recent", get(recent_messages))
}

#[derive(Deserialize)]
pub struct SurveyTurnRequest {
    /// The user's message; an absent/empty message starts the conversation.
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Serialize)]
pub struct ChatResponse {
    pub id: String,
    pub messages: Vec<Message>,
    pub survey_completed: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Run one survey turn and return the updated chat.
async fn survey_turn(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<SurveyTurnRequest>,
) -> Result<Json<ChatResponse>> {
    let message = payload.message.unwrap_or_default();

    tracing::debug!(uid = %user.uid, chars = message.len(), "Survey turn");

    let turn = state.survey_service.run_turn(&user.uid, message).await?;

    Ok(Json(ChatResponse {
        id: turn.chat.id,
        messages: turn.chat.messages,
        survey_completed: turn.survey_completed,
        created_at: turn.chat.created_at,
        updated_at: turn.chat.updated_at,
    }))
}

#[derive(Serialize)]
pub struct SurveyResponse {
    pub id: String,
    pub messages: Vec<Message>,
    pub created_at: String,
    pub updated_at: String,
}

/// Full survey chat (404 if the user never started it).
async fn get_survey(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<SurveyResponse>> {
    let chat = state.survey_service.get_chat(&user.uid).await?;

    Ok(Json(SurveyResponse {
        id: chat.id,
        messages: chat.messages,
        created_at: chat.created_at,
        updated_at: chat.updated_at,
    }))
}

#[derive(Serialize)]
pub struct RecentMessagesResponse {
    pub id: String,
    pub messages: Vec<Message>,
}

/// The last few messages, for the chat widget preview.
async fn recent_messages(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<RecentMessagesResponse>> {
    let chat = state.survey_service.get_chat(&user.uid).await?;
    let messages = chat.recent_messages(RECENT_MESSAGE_COUNT);

    Ok(Json(RecentMessagesResponse {
        id: chat.id,
        messages,
    }))
}
