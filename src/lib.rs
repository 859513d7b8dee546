// SPDX-License-Identifier: MIT

//! Roomly API: backend for the roommate-matching app.
//!
//! Handles onboarding profiles, the AI survey chat that extracts lifestyle
//! preferences, Square merchant OAuth, and Stripe subscription billing.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use services::{FirebaseAuthVerifier, SquareService, StripeService, SurveyService};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub firebase_verifier: Arc<FirebaseAuthVerifier>,
    pub survey_service: SurveyService,
    pub square_service: SquareService,
    pub stripe_service: StripeService,
}
