// SPDX-License-Identifier: MIT

//! Square merchant connection routes.
//!
//! The authenticated endpoints manage credentials and start the OAuth flow;
//! the public callback completes it. The `state` parameter carries the uid
//! across the round-trip through Square, HMAC-signed so the callback can
//! trust it.

use axum::{
    extract::{Query, State},
    response::Redirect,
    routing::{get, post},
    Extension, Json, Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::AppState;

type HmacSha256 = Hmac<Sha256>;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/square/oauth/start", post(oauth_start))
        .route("/api/square/credentials", get(get_credentials))
        .route("/api/square/status", get(oauth_status))
        .route("/api/square/catalog/search", get(catalog_search))
}

/// Public routes (reached by Square's redirect, no session).
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/square/callback", get(oauth_callback))
}

// ─── OAuth start ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct OauthStartRequest {
    pub app_id: String,
    pub app_secret: String,
}

#[derive(Serialize)]
pub struct OauthStartResponse {
    pub authorization_url: String,
}

/// Store the merchant's app credentials and build the authorize URL.
async fn oauth_start(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<OauthStartRequest>,
) -> Result<Json<OauthStartResponse>> {
    if payload.app_id.trim().is_empty() || payload.app_secret.trim().is_empty() {
        return Err(AppError::BadRequest(
            "app_id and app_secret are required".to_string(),
        ));
    }

    let mut profile = state.db.require_user(&user.uid).await?;
    profile.square_app_id = Some(payload.app_id.clone());
    profile.square_app_secret = Some(payload.app_secret);
    profile.updated_at = crate::time_utils::now_rfc3339();
    state.db.upsert_user(&profile).await?;

    let oauth_state = sign_state(&user.uid, &state.config.oauth_state_key)?;
    let redirect_uri = callback_uri(&state.config.api_url);
    let authorization_url =
        state
            .square_service
            .authorize_url(&payload.app_id, &redirect_uri, &oauth_state);

    tracing::info!(uid = %user.uid, "Starting Square OAuth flow");

    Ok(Json(OauthStartResponse { authorization_url }))
}

// ─── OAuth callback ──────────────────────────────────────────

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// OAuth callback - exchange code for tokens and store them on the user.
async fn oauth_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Result<Redirect> {
    let settings_url = format!("{}/dashboard/settings", state.config.frontend_url);

    if let Some(error) = params.error {
        let description = params.error_description.unwrap_or_default();
        tracing::warn!(error = %error, description = %description, "Square OAuth error");
        return Ok(Redirect::temporary(&format!(
            "{}?error={}",
            settings_url,
            urlencoding::encode(&error)
        )));
    }

    let code = params
        .code
        .ok_or_else(|| AppError::BadRequest("Missing authorization code".to_string()))?;
    let signed_state = params
        .state
        .ok_or_else(|| AppError::BadRequest("Missing state parameter".to_string()))?;

    // The uid travels through Square inside the signed state; a bad
    // signature is a hard failure, never a fallback.
    let uid = verify_and_decode_state(&signed_state, &state.config.oauth_state_key)
        .ok_or_else(|| AppError::BadRequest("Invalid or tampered state parameter".to_string()))?;

    let mut profile = state.db.require_user(&uid).await?;
    let (app_id, app_secret) = match (&profile.square_app_id, &profile.square_app_secret) {
        (Some(id), Some(secret)) => (id.clone(), secret.clone()),
        _ => {
            return Err(AppError::BadRequest(
                "Square credentials not configured".to_string(),
            ))
        }
    };

    tracing::info!(uid = %uid, "Exchanging Square authorization code for tokens");

    let redirect_uri = callback_uri(&state.config.api_url);
    let tokens = state
        .square_service
        .exchange_code(&app_id, &app_secret, &code, &redirect_uri)
        .await?;

    profile.square_access_token = Some(tokens.access_token);
    profile.square_refresh_token = Some(tokens.refresh_token);
    profile.square_merchant_id = Some(tokens.merchant_id);
    profile.updated_at = crate::time_utils::now_rfc3339();
    state.db.upsert_user(&profile).await?;

    tracing::info!(uid = %uid, "Square merchant connected");

    Ok(Redirect::temporary(&settings_url))
}

// ─── Credentials / status ────────────────────────────────────

#[derive(Serialize)]
pub struct CredentialsResponse {
    pub app_id: Option<String>,
    pub app_secret: Option<String>,
}

/// Stored Square app credentials (nulls when not configured).
async fn get_credentials(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<CredentialsResponse>> {
    let profile = state.db.get_user(&user.uid).await?;

    Ok(Json(match profile {
        Some(p) => CredentialsResponse {
            app_id: p.square_app_id,
            app_secret: p.square_app_secret,
        },
        None => CredentialsResponse {
            app_id: None,
            app_secret: None,
        },
    }))
}

#[derive(Serialize)]
pub struct OauthStatusResponse {
    pub connected: bool,
}

/// Whether the merchant's OAuth connection is established.
async fn oauth_status(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<OauthStatusResponse>> {
    let connected = state
        .db
        .get_user(&user.uid)
        .await?
        .map(|p| p.square_connected())
        .unwrap_or(false);

    Ok(Json(OauthStatusResponse { connected }))
}

// ─── Catalog search ──────────────────────────────────────────

#[derive(Deserialize)]
pub struct CatalogSearchParams {
    q: String,
}

#[derive(Serialize)]
pub struct CatalogSearchResponse {
    pub items: Vec<crate::services::square::CatalogItem>,
}

/// Search the connected merchant's catalog by item name.
async fn catalog_search(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<CatalogSearchParams>,
) -> Result<Json<CatalogSearchResponse>> {
    if params.q.trim().is_empty() {
        return Err(AppError::BadRequest("Query must not be empty".to_string()));
    }

    let profile = state.db.require_user(&user.uid).await?;
    if !profile.square_connected() {
        return Err(AppError::BadRequest(
            "Square account not connected".to_string(),
        ));
    }
    let access_token = profile
        .square_access_token
        .ok_or_else(|| AppError::BadRequest("Square account not connected".to_string()))?;

    let items = state
        .square_service
        .search_catalog_items(&access_token, params.q.trim())
        .await?;

    Ok(Json(CatalogSearchResponse { items }))
}

// ─── Signed state helpers ────────────────────────────────────

/// Sign `uid|timestamp` and base64-encode `payload|signature_hex`.
pub fn sign_state(uid: &str, secret: &[u8]) -> Result<String> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
        .as_millis();

    let payload = format!("{}|{:x}", uid, timestamp);

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    let signature = mac.finalize().into_bytes();

    let signed = format!("{}|{}", payload, hex::encode(signature));
    Ok(URL_SAFE_NO_PAD.encode(signed.as_bytes()))
}

/// Verify the HMAC signature and decode the uid from the state parameter.
pub fn verify_and_decode_state(state: &str, secret: &[u8]) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let state_str = String::from_utf8(bytes).ok()?;

    // Format is "uid|timestamp_hex|signature_hex"
    let parts: Vec<&str> = state_str.splitn(3, '|').collect();
    if parts.len() != 3 {
        return None;
    }

    let uid = parts[0];
    let timestamp_hex = parts[1];
    let signature_hex = parts[2];

    let payload = format!("{}|{}", uid, timestamp_hex);

    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(payload.as_bytes());

    let expected_signature = hex::encode(mac.finalize().into_bytes());

    if signature_hex != expected_signature {
        tracing::error!("OAuth state signature mismatch! Potential tampering.");
        return None;
    }

    Some(uid.to_string())
}

fn callback_uri(api_url: &str) -> String {
    format!("{}/square/callback", api_url.trim_end_matches('/'))
}
