//! User model for storage and API.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What a user is on the platform for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LookingFor {
    Renting,
    Roommate,
    Both,
}

/// User profile stored in Firestore (document ID = uid).
///
/// Mutated incrementally by different endpoints: profile setup, the Square
/// OAuth callback, survey extraction, and billing. All writes go through
/// fetch-modify-write in the db layer to preserve unrelated fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Firebase uid (also used as document ID)
    pub uid: String,
    /// Email address (may be None if not shared)
    pub email: Option<String>,
    /// Display name
    pub display_name: Option<String>,

    // --- Onboarding ---
    #[serde(default)]
    pub on_boarded: bool,
    #[serde(default)]
    pub survey_completed: bool,
    pub looking_for: Option<LookingFor>,
    pub zip_code: Option<String>,
    pub phone: Option<String>,
    pub location_seeking_zip_code: Option<String>,

    // --- Square merchant connection ---
    pub square_app_id: Option<String>,
    pub square_app_secret: Option<String>,
    pub square_access_token: Option<String>,
    pub square_refresh_token: Option<String>,
    pub square_merchant_id: Option<String>,

    // --- Billing ---
    pub stripe_customer_id: Option<String>,
    pub subscription_id: Option<String>,
    pub subscription_status: Option<String>,
    pub price_id: Option<String>,

    /// Free-form lifestyle characteristics extracted by the survey
    /// (religion, budget, hobbies, ...). Keys come from the extraction tool
    /// schema but the map deliberately stays open-ended.
    #[serde(default)]
    pub characteristics: BTreeMap<String, serde_json::Value>,

    /// When the user first connected (RFC3339)
    pub created_at: String,
    /// Last update timestamp (RFC3339)
    pub updated_at: String,
}

impl User {
    /// A fresh user skeleton, created on first authenticated contact.
    pub fn new(uid: String, email: Option<String>, display_name: Option<String>) -> Self {
        let now = crate::time_utils::now_rfc3339();
        Self {
            uid,
            email,
            display_name,
            on_boarded: false,
            survey_completed: false,
            looking_for: None,
            zip_code: None,
            phone: None,
            location_seeking_zip_code: None,
            square_app_id: None,
            square_app_secret: None,
            square_access_token: None,
            square_refresh_token: None,
            square_merchant_id: None,
            stripe_customer_id: None,
            subscription_id: None,
            subscription_status: None,
            price_id: None,
            characteristics: BTreeMap::new(),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Whether both Square OAuth tokens are present.
    pub fn square_connected(&self) -> bool {
        self.square_access_token.is_some() && self.square_refresh_token.is_some()
    }

    /// Merge extracted characteristics into the user record.
    ///
    /// Null values never overwrite previously extracted data; everything
    /// else replaces the existing entry.
    pub fn merge_characteristics(&mut self, extracted: serde_json::Map<String, serde_json::Value>) {
        for (key, value) in extracted {
            if value.is_null() {
                continue;
            }
            self.characteristics.insert(key, value);
        }
    }
}
