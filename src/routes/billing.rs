// SPDX-License-Identifier: MIT

//! Subscription billing routes (Stripe Checkout).

use axum::{extract::State, routing::post, Extension, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/billing/checkout", post(create_checkout))
}

#[derive(Deserialize)]
pub struct CheckoutRequest {
    pub price_id: String,
}

#[derive(Serialize)]
pub struct CheckoutResponse {
    pub session_id: String,
    pub url: Option<String>,
}

/// Create a subscription Checkout Session for the authenticated user,
/// creating their Stripe customer first if they don't have one yet.
async fn create_checkout(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>> {
    if payload.price_id.trim().is_empty() {
        return Err(AppError::BadRequest("price_id is required".to_string()));
    }

    let mut profile = state.db.require_user(&user.uid).await?;

    let customer_id = match &profile.stripe_customer_id {
        Some(id) => id.clone(),
        None => {
            let id = state
                .stripe_service
                .create_customer(&user.uid, profile.email.as_deref())
                .await?;
            tracing::info!(uid = %user.uid, customer_id = %id, "Created Stripe customer");
            profile.stripe_customer_id = Some(id.clone());
            profile.updated_at = crate::time_utils::now_rfc3339();
            state.db.upsert_user(&profile).await?;
            id
        }
    };

    let success_url = format!("{}/dashboard?success=true", state.config.frontend_url);
    let cancel_url = format!(
        "{}/dashboard/payments?canceled=true",
        state.config.frontend_url
    );

    let session = state
        .stripe_service
        .create_checkout_session(
            &customer_id,
            &user.uid,
            &payload.price_id,
            &success_url,
            &cancel_url,
        )
        .await?;

    tracing::info!(uid = %user.uid, session_id = %session.id, "Created checkout session");

    Ok(Json(CheckoutResponse {
        session_id: session.id,
        url: session.url,
    }))
}
