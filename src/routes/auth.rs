// SPDX-License-Identifier: MIT

//! Session authentication routes.
//!
//! The frontend signs in with Firebase and posts the ID token here; we
//! verify it, make sure a user document exists, and mint the session JWT
//! the rest of the API accepts.

use axum::{
    extract::State,
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::middleware::auth::create_session_jwt;
use crate::models::User;
use crate::services::firebase::FirebaseAuthError;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/session", post(create_session))
        .route("/auth/logout", get(logout))
}

#[derive(Deserialize)]
pub struct SessionRequest {
    pub id_token: String,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub uid: String,
}

/// Exchange a Firebase ID token for a session JWT.
async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SessionRequest>,
) -> Result<Json<SessionResponse>> {
    let identity = state
        .firebase_verifier
        .verify_id_token(&payload.id_token)
        .await
        .map_err(|e| match e {
            FirebaseAuthError::Forbidden(msg) => {
                tracing::warn!(reason = %msg, "Rejected Firebase ID token");
                AppError::InvalidToken
            }
            FirebaseAuthError::Transient(msg) => {
                AppError::Internal(anyhow::anyhow!("Firebase JWKS unavailable: {}", msg))
            }
        })?;

    // First authenticated contact creates the user skeleton.
    if state.db.get_user(&identity.uid).await?.is_none() {
        tracing::info!(uid = %identity.uid, "Creating user record");
        let user = User::new(
            identity.uid.clone(),
            identity.email.clone(),
            identity.display_name.clone(),
        );
        state.db.upsert_user(&user).await?;
    }

    let token = create_session_jwt(&identity.uid, &state.config.jwt_signing_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    Ok(Json(SessionResponse {
        token,
        uid: identity.uid,
    }))
}

/// Logout - just a placeholder that clears client-side token.
async fn logout() -> Redirect {
    // The actual logout happens on client side by clearing localStorage
    Redirect::temporary("/")
}
