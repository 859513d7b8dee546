// SPDX-License-Identifier: MIT

//! Stripe API client: customers, Checkout sessions and webhook signatures.

use crate::error::AppError;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

const STRIPE_BASE_URL: &str = "https://api.stripe.com";

/// Maximum accepted age of a webhook timestamp (replay protection).
const WEBHOOK_TOLERANCE_SECS: i64 = 300;

/// Stripe API client.
#[derive(Clone)]
pub struct StripeService {
    http: reqwest::Client,
    base_url: String,
    secret_key: String,
}

/// A created Checkout session.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct Customer {
    id: String,
}

impl StripeService {
    pub fn new(secret_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: STRIPE_BASE_URL.to_string(),
            secret_key,
        }
    }

    /// Override the API base URL (tests).
    #[doc(hidden)]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Create a Stripe customer tagged with our uid.
    pub async fn create_customer(
        &self,
        uid: &str,
        email: Option<&str>,
    ) -> Result<String, AppError> {
        let url = format!("{}/v1/customers", self.base_url);

        let mut form: Vec<(&str, String)> = vec![("metadata[userId]", uid.to_string())];
        if let Some(email) = email {
            form.push(("email", email.to_string()));
        }

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::StripeApi(format!("Customer creation failed: {}", e)))?;

        let customer: Customer = self.check_response_json(response).await?;
        Ok(customer.id)
    }

    /// Create a subscription-mode Checkout session for a price.
    pub async fn create_checkout_session(
        &self,
        customer_id: &str,
        uid: &str,
        price_id: &str,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<CheckoutSession, AppError> {
        let url = format!("{}/v1/checkout/sessions", self.base_url);

        let form: Vec<(&str, String)> = vec![
            ("customer", customer_id.to_string()),
            ("client_reference_id", uid.to_string()),
            ("payment_method_types[0]", "card".to_string()),
            ("mode", "subscription".to_string()),
            ("line_items[0][price]", price_id.to_string()),
            ("line_items[0][quantity]", "1".to_string()),
            ("success_url", success_url.to_string()),
            ("cancel_url", cancel_url.to_string()),
            ("subscription_data[metadata][userId]", uid.to_string()),
        ];

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::StripeApi(format!("Checkout session failed: {}", e)))?;

        self.check_response_json(response).await
    }

    /// Check response and parse JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::StripeApi(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::StripeApi(format!("JSON parse error: {}", e)))
    }
}

/// Verify a `Stripe-Signature` header against the raw request payload.
///
/// The header carries `t=<unix seconds>,v1=<hex hmac>,...`; the signed
/// message is `"{t}.{payload}"`. Comparison is constant-time and the
/// timestamp must be within the tolerance window.
pub fn verify_webhook_signature(
    secret: &str,
    payload: &[u8],
    signature_header: &str,
    now_unix: i64,
) -> Result<(), AppError> {
    let mut timestamp: Option<i64> = None;
    let mut candidates: Vec<Vec<u8>> = Vec::new();

    for element in signature_header.split(',') {
        let mut parts = element.trim().splitn(2, '=');
        match (parts.next(), parts.next()) {
            (Some("t"), Some(value)) => {
                timestamp = value.parse().ok();
            }
            (Some("v1"), Some(value)) => {
                if let Ok(bytes) = hex::decode(value) {
                    candidates.push(bytes);
                }
            }
            _ => {}
        }
    }

    let timestamp = timestamp
        .ok_or_else(|| AppError::BadRequest("Missing timestamp in signature header".to_string()))?;

    if (now_unix - timestamp).abs() > WEBHOOK_TOLERANCE_SECS {
        return Err(AppError::BadRequest(
            "Webhook timestamp outside tolerance".to_string(),
        ));
    }

    if candidates.is_empty() {
        return Err(AppError::BadRequest(
            "Missing v1 signature in signature header".to_string(),
        ));
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    let expected = mac.finalize().into_bytes();

    for candidate in &candidates {
        if candidate.len() == expected.len()
            && bool::from(candidate.as_slice().ct_eq(expected.as_slice()))
        {
            return Ok(());
        }
    }

    Err(AppError::BadRequest(
        "Webhook signature mismatch".to_string(),
    ))
}

/// Compute a valid signature header for a payload (tests and tooling).
pub fn sign_webhook_payload(secret: &str, payload: &[u8], timestamp: i64) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key size");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}
