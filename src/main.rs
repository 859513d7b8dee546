// SPDX-License-Identifier: MIT

//! Roomly API Server
//!
//! Backend for the roommate-matching app: onboarding, the AI preference
//! survey, Square merchant OAuth and Stripe subscription billing.

use roomly_api::{
    config::Config,
    db::FirestoreDb,
    services::{FirebaseAuthVerifier, GeminiClient, SquareService, StripeService, SurveyService},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Roomly API");

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.gcp_project_id)
        .await
        .expect("Failed to connect to Firestore");

    let firebase_verifier = Arc::new(
        FirebaseAuthVerifier::new(&config.gcp_project_id)
            .expect("Failed to initialize Firebase verifier"),
    );

    let gemini = GeminiClient::new(config.gemini_api_key.clone(), config.gemini_model.clone());
    tracing::info!(model = %config.gemini_model, "Gemini client initialized");

    // Per-user survey turn locks, shared across all requests in this instance
    let turn_locks = Arc::new(dashmap::DashMap::new());
    let survey_service = SurveyService::new(db.clone(), gemini, turn_locks);

    let square_service = SquareService::new();
    let stripe_service = StripeService::new(config.stripe_secret_key.clone());

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        firebase_verifier,
        survey_service,
        square_service,
        stripe_service,
    });

    // Build router
    let app = roomly_api::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("roomly_api=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
