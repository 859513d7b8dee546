// SPDX-License-Identifier: MIT

//! Profile routes for authenticated users.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::AppState;
use axum::{
    extract::State,
    routing::{delete, get},
    Extension, Json, Router,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/account", delete(delete_account))
}

/// Current user response.
#[derive(Serialize)]
pub struct UserResponse {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub on_boarded: bool,
    pub survey_completed: bool,
    pub subscription_status: Option<String>,
    pub characteristics: BTreeMap<String, serde_json::Value>,
}

/// Get current user profile.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserResponse>> {
    let profile = state.db.require_user(&user.uid).await?;

    Ok(Json(UserResponse {
        uid: profile.uid,
        email: profile.email,
        display_name: profile.display_name,
        on_boarded: profile.on_boarded,
        survey_completed: profile.survey_completed,
        subscription_status: profile.subscription_status,
        characteristics: profile.characteristics,
    }))
}

/// Response for account deletion.
#[derive(Serialize)]
pub struct DeleteAccountResponse {
    pub success: bool,
    pub deleted: usize,
}

/// Delete the user's profile and survey chat.
async fn delete_account(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<DeleteAccountResponse>> {
    tracing::info!(uid = %user.uid, "User-initiated account deletion");

    let deleted = state.db.delete_user_data(&user.uid).await?;

    Ok(Json(DeleteAccountResponse {
        success: true,
        deleted,
    }))
}
