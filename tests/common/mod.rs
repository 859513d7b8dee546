// SPDX-License-Identifier: MIT

use roomly_api::config::Config;
use roomly_api::db::FirestoreDb;
use roomly_api::routes::create_router;
use roomly_api::services::{
    FirebaseAuthVerifier, GeminiClient, SquareService, StripeService, SurveyService,
};
use roomly_api::AppState;
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

/// Create a test app with offline mock dependencies.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();
    let db = test_db_offline();

    let firebase_verifier = Arc::new(
        FirebaseAuthVerifier::new(&config.gcp_project_id)
            .expect("Failed to build Firebase verifier"),
    );

    let gemini = GeminiClient::new(
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
    );
    let turn_locks = Arc::new(dashmap::DashMap::new());
    let survey_service = SurveyService::new(db.clone(), gemini, turn_locks);

    let square_service = SquareService::new();
    let stripe_service = StripeService::new(config.stripe_secret_key.clone());

    let state = Arc::new(AppState {
        config,
        db,
        firebase_verifier,
        survey_service,
        square_service,
        stripe_service,
    });

    (create_router(state.clone()), state)
}

/// Serve a stub vendor API on an ephemeral local port.
/// Returns the base URL to point a client at via `with_base_url`.
#[allow(dead_code)]
pub async fn spawn_stub_server(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind stub server");
    let addr = listener.local_addr().expect("stub server address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("stub server failed");
    });
    format!("http://{}", addr)
}

/// Create a session JWT signed with the test config's key.
#[allow(dead_code)]
pub fn create_test_jwt(uid: &str, signing_key: &[u8]) -> String {
    roomly_api::middleware::auth::create_session_jwt(uid, signing_key)
        .expect("Failed to create test JWT")
}
