// SPDX-License-Identifier: MIT

//! External service integrations.

pub mod firebase;
pub mod gemini;
pub mod square;
pub mod stripe;
pub mod survey;

pub use firebase::FirebaseAuthVerifier;
pub use gemini::GeminiClient;
pub use square::SquareService;
pub use stripe::StripeService;
pub use survey::SurveyService;
