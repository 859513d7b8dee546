// SPDX-License-Identifier: MIT

//! Stripe webhook endpoint.
//!
//! The signature is verified against the raw body before any parsing.
//! Well-signed events we don't care about are acknowledged with 200 so
//! Stripe stops retrying them.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Router,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{AppError, Result};
use crate::services::stripe::verify_webhook_signature;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/webhooks/stripe", post(handle_stripe_webhook))
}

#[derive(Deserialize)]
struct StripeEvent {
    #[serde(rename = "type")]
    event_type: String,
    data: StripeEventData,
}

#[derive(Deserialize)]
struct StripeEventData {
    object: Value,
}

async fn handle_stripe_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing Stripe-Signature header".to_string()))?;

    let now_unix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
        .as_secs() as i64;

    verify_webhook_signature(
        &state.config.stripe_webhook_secret,
        &body,
        signature,
        now_unix,
    )
    .map_err(|e| {
        tracing::error!(error = %e, "SECURITY: Stripe webhook signature verification failed");
        e
    })?;

    // Malformed bodies after a valid signature get acknowledged; failing
    // here would just make Stripe retry a payload we can never parse.
    let event: StripeEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring unparseable webhook body");
            return Ok(StatusCode::OK);
        }
    };

    tracing::info!(event_type = %event.event_type, "Received Stripe webhook");

    match event.event_type.as_str() {
        "checkout.session.completed" => {
            handle_checkout_completed(&state, &event.data.object).await?;
        }
        "customer.subscription.updated" | "customer.subscription.deleted" => {
            handle_subscription_change(&state, &event.data.object).await?;
        }
        other => {
            tracing::debug!(event_type = %other, "Unhandled webhook event type");
        }
    }

    Ok(StatusCode::OK)
}

/// Checkout finished: record the new subscription on the user.
async fn handle_checkout_completed(state: &AppState, session: &Value) -> Result<()> {
    let Some(uid) = session
        .get("client_reference_id")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
    else {
        tracing::warn!("checkout.session.completed without client_reference_id");
        return Ok(());
    };

    let mut user = match state.db.get_user(uid).await? {
        Some(user) => user,
        None => {
            tracing::warn!(uid = %uid, "Webhook references unknown user");
            return Ok(());
        }
    };

    if let Some(subscription_id) = session.get("subscription").and_then(Value::as_str) {
        user.subscription_id = Some(subscription_id.to_string());
    }
    if let Some(customer_id) = session.get("customer").and_then(Value::as_str) {
        user.stripe_customer_id = Some(customer_id.to_string());
    }
    user.subscription_status = Some("active".to_string());
    user.updated_at = crate::time_utils::now_rfc3339();
    state.db.upsert_user(&user).await?;

    tracing::info!(uid = %uid, "Subscription checkout completed");
    Ok(())
}

/// Subscription lifecycle change: sync status and price onto the user.
async fn handle_subscription_change(state: &AppState, subscription: &Value) -> Result<()> {
    let Some(uid) = subscription
        .pointer("/metadata/userId")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
    else {
        tracing::warn!("Subscription event without userId metadata");
        return Ok(());
    };

    let mut user = match state.db.get_user(uid).await? {
        Some(user) => user,
        None => {
            tracing::warn!(uid = %uid, "Webhook references unknown user");
            return Ok(());
        }
    };

    if let Some(id) = subscription.get("id").and_then(Value::as_str) {
        user.subscription_id = Some(id.to_string());
    }
    if let Some(status) = subscription.get("status").and_then(Value::as_str) {
        user.subscription_status = Some(status.to_string());
    }
    if let Some(price_id) = subscription
        .pointer("/items/data/0/price/id")
        .and_then(Value::as_str)
    {
        user.price_id = Some(price_id.to_string());
    }
    user.updated_at = crate::time_utils::now_rfc3339();
    state.db.upsert_user(&user).await?;

    tracing::info!(
        uid = %uid,
        status = ?user.subscription_status,
        "Subscription state synced"
    );
    Ok(())
}
