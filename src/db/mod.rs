//! Database layer (Firestore).

pub mod firestore;

pub use firestore::FirestoreDb;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// Survey chat documents (keyed by uid, one per user)
    pub const SURVEY_CHATS: &str = "survey_chats";
}
