// SPDX-License-Identifier: MIT

//! Onboarding profile routes.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::LookingFor;
use crate::AppState;
use axum::{
    extract::State,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::{Validate, ValidationError};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/setup/profile", post(setup_profile))
        .route("/api/setup/status", get(user_status))
}

/// Generic result envelope used by the onboarding form.
///
/// Validation failures come back as HTTP 200 with `success: false` and a
/// list of messages the form renders inline; this is the contract the
/// frontend wizard was built against.
#[derive(Serialize)]
pub struct ApiResult<T> {
    pub success: bool,
    pub error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    pub messages: Vec<String>,
}

#[derive(Deserialize, Validate)]
pub struct SetupProfileRequest {
    #[validate(custom(function = "validate_zip_code", message = "Zip code is not valid"))]
    pub zip_code: String,
    #[validate(custom(function = "validate_us_phone", message = "Phone number is not valid"))]
    pub phone: String,
    pub looking_for: LookingFor,
    #[validate(custom(
        function = "validate_zip_code",
        message = "Location seeking zip code is not valid"
    ))]
    pub location_seeking_zip_code: String,
}

/// Zip codes are exactly five ASCII digits.
fn validate_zip_code(value: &str) -> std::result::Result<(), ValidationError> {
    if value.len() == 5 && value.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::new("zip_code"))
    }
}

/// US phone number: optional `+CC ` prefix, then 3-3-4 digits with an
/// optional parenthesized area code and space/dot/dash separators.
fn validate_us_phone(value: &str) -> std::result::Result<(), ValidationError> {
    let invalid = || ValidationError::new("phone");

    let mut rest = value;
    if let Some(stripped) = rest.strip_prefix('+') {
        // country code: 1-2 digits followed by a space
        let digits = stripped.chars().take_while(|c| c.is_ascii_digit()).count();
        if !(1..=2).contains(&digits) {
            return Err(invalid());
        }
        rest = stripped[digits..].strip_prefix(' ').ok_or_else(invalid)?;
    }

    // optional parentheses around the area code
    let (area, tail) = if let Some(stripped) = rest.strip_prefix('(') {
        let close = stripped.find(')').ok_or_else(invalid)?;
        (&stripped[..close], &stripped[close + 1..])
    } else if rest.len() >= 3 {
        (&rest[..3], &rest[3..])
    } else {
        return Err(invalid());
    };

    if area.len() != 3 || !area.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let is_sep = |c: char| c == ' ' || c == '.' || c == '-';
    let mut chars = tail.chars();
    if !chars.next().map(is_sep).unwrap_or(false) {
        return Err(invalid());
    }
    let tail = chars.as_str();

    let (exchange, tail) = tail.split_at_checked(3).ok_or_else(invalid)?;
    if !exchange.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let mut chars = tail.chars();
    if !chars.next().map(is_sep).unwrap_or(false) {
        return Err(invalid());
    }
    let line = chars.as_str();

    if line.len() == 4 && line.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(invalid())
    }
}

/// Complete the onboarding profile.
async fn setup_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<SetupProfileRequest>,
) -> Result<Json<ApiResult<bool>>> {
    if let Err(errors) = payload.validate() {
        let messages: Vec<String> = errors
            .field_errors()
            .into_values()
            .flatten()
            .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
            .collect();

        tracing::debug!(uid = %user.uid, ?messages, "Profile validation failed");

        return Ok(Json(ApiResult {
            success: false,
            error: true,
            data: Some(false),
            messages,
        }));
    }

    let mut profile = state.db.require_user(&user.uid).await?;
    profile.zip_code = Some(payload.zip_code);
    profile.phone = Some(payload.phone);
    profile.looking_for = Some(payload.looking_for);
    profile.location_seeking_zip_code = Some(payload.location_seeking_zip_code);
    profile.on_boarded = true;
    profile.updated_at = crate::time_utils::now_rfc3339();

    state.db.upsert_user(&profile).await?;

    tracing::info!(uid = %user.uid, "Onboarding profile completed");

    Ok(Json(ApiResult {
        success: true,
        error: false,
        data: Some(true),
        messages: vec!["Profile saved".to_string()],
    }))
}

#[derive(Serialize)]
pub struct UserStatusResponse {
    pub on_boarded: bool,
    pub survey_completed: bool,
}

/// Onboarding/survey progress flags for the authenticated user.
async fn user_status(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserStatusResponse>> {
    let profile = state.db.require_user(&user.uid).await?;

    Ok(Json(UserStatusResponse {
        on_boarded: profile.on_boarded,
        survey_completed: profile.survey_completed,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zip_code_rules() {
        assert!(validate_zip_code("94040").is_ok());
        assert!(validate_zip_code("9404").is_err());
        assert!(validate_zip_code("940400").is_err());
        assert!(validate_zip_code("94o40").is_err());
        assert!(validate_zip_code("").is_err());
    }

    #[test]
    fn phone_accepts_common_shapes() {
        assert!(validate_us_phone("650-555-1234").is_ok());
        assert!(validate_us_phone("650.555.1234").is_ok());
        assert!(validate_us_phone("650 555 1234").is_ok());
        assert!(validate_us_phone("(650) 555-1234").is_ok());
        assert!(validate_us_phone("+1 650-555-1234").is_ok());
        assert!(validate_us_phone("+44 650-555-1234").is_ok());
    }

    #[test]
    fn phone_rejects_bad_shapes() {
        assert!(validate_us_phone("6505551234").is_err()); // no separators
        assert!(validate_us_phone("650-555-123").is_err()); // short line
        assert!(validate_us_phone("650-555-12345").is_err());
        assert!(validate_us_phone("+123 650-555-1234").is_err()); // 3-digit CC
        assert!(validate_us_phone("abc-def-ghij").is_err());
        assert!(validate_us_phone("").is_err());
    }
}
