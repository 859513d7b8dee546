// SPDX-License-Identifier: MIT

//! Stripe webhook endpoint tests.
//!
//! Signature verification must happen before any body parsing, and
//! well-signed events we don't handle must still be acknowledged.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use roomly_api::services::stripe::sign_webhook_payload;
use std::time::{SystemTime, UNIX_EPOCH};
use tower::ServiceExt;

mod common;

const WEBHOOK_SECRET: &str = "whsec_test_123";

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

async fn post_webhook(payload: &str, signature: Option<String>) -> StatusCode {
    let (app, _) = common::create_test_app();

    let mut builder = Request::builder().method("POST").uri("/webhooks/stripe");
    if let Some(sig) = signature {
        builder = builder.header("stripe-signature", sig);
    }

    app.oneshot(builder.body(Body::from(payload.to_string())).unwrap())
        .await
        .unwrap()
        .status()
}

#[tokio::test]
async fn test_missing_signature_rejected() {
    let status = post_webhook(r#"{"type":"checkout.session.completed"}"#, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_signature_rejected() {
    let status = post_webhook(
        r#"{"type":"checkout.session.completed"}"#,
        Some("t=12345,v1=deadbeef".to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stale_signature_rejected() {
    let payload = r#"{"type":"ping"}"#;
    let sig = sign_webhook_payload(WEBHOOK_SECRET, payload.as_bytes(), now_unix() - 3600);
    let status = post_webhook(payload, Some(sig)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unhandled_event_acknowledged() {
    let payload = r#"{"type":"invoice.paid","data":{"object":{}}}"#;
    let sig = sign_webhook_payload(WEBHOOK_SECRET, payload.as_bytes(), now_unix());
    let status = post_webhook(payload, Some(sig)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_well_signed_garbage_body_acknowledged() {
    // A valid signature over a body we can't parse: acknowledge rather
    // than provoke endless Stripe retries.
    let payload = "not json at all";
    let sig = sign_webhook_payload(WEBHOOK_SECRET, payload.as_bytes(), now_unix());
    let status = post_webhook(payload, Some(sig)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_signature_over_different_payload_rejected() {
    let sig = sign_webhook_payload(WEBHOOK_SECRET, b"{\"type\":\"a\"}", now_unix());
    let status = post_webhook(r#"{"type":"b"}"#, Some(sig)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_subscription_event_without_metadata_acknowledged() {
    // Missing userId metadata is logged and skipped, never an error
    let payload = r#"{"type":"customer.subscription.updated","data":{"object":{"id":"sub_1","status":"active","metadata":{}}}}"#;
    let sig = sign_webhook_payload(WEBHOOK_SECRET, payload.as_bytes(), now_unix());
    let status = post_webhook(payload, Some(sig)).await;
    assert_eq!(status, StatusCode::OK);
}
