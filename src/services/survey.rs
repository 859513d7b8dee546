// SPDX-License-Identifier: MIT

//! Survey turn processing.
//!
//! One turn = append the user message, run the extraction call, run the
//! conversational call, append the reply, and commit chat + user documents
//! in a single transaction. Turns for the same user are serialized by a
//! per-uid lock so two concurrent requests cannot interleave their
//! read-modify-write of the chat document.

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::{Chat, MessageRole, User};
use crate::services::GeminiClient;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared per-user turn locks type for use in AppState.
pub type TurnLocks = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// Outcome of one survey turn.
pub struct SurveyTurn {
    pub chat: Chat,
    pub survey_completed: bool,
}

/// High-level survey service orchestrating chat persistence and model calls.
#[derive(Clone)]
pub struct SurveyService {
    db: FirestoreDb,
    gemini: GeminiClient,
    /// Per-user mutex to serialize survey turns.
    turn_locks: TurnLocks,
}

impl SurveyService {
    /// Create a new survey service.
    ///
    /// `turn_locks` should be shared across all instances within a server
    /// process so every request for a uid contends on the same lock.
    pub fn new(db: FirestoreDb, gemini: GeminiClient, turn_locks: TurnLocks) -> Self {
        Self {
            db,
            gemini,
            turn_locks,
        }
    }

    /// Process one conversational survey turn for a user.
    ///
    /// An empty message is allowed: the opener turn seeds the conversation
    /// and the assistant greets the user.
    pub async fn run_turn(&self, uid: &str, message: String) -> Result<SurveyTurn, AppError> {
        let lock = self
            .turn_locks
            .entry(uid.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let _guard = lock.lock().await;

        let mut user = self.db.require_user(uid).await?;

        let mut chat = match self.db.get_chat(uid).await? {
            Some(mut existing) => {
                existing.sort_messages();
                existing
            }
            None => {
                tracing::info!(uid, "Creating survey chat");
                Chat::new()
            }
        };

        chat.push_message(MessageRole::User, message);

        // Extraction pass: merge whatever the model has learned so far into
        // the user record (in memory; persisted with the chat below).
        let extraction = self.gemini.extract_characteristics(&chat.messages).await?;
        let extracted_count = extraction.characteristics.len();
        user.merge_characteristics(extraction.characteristics);
        if extraction.survey_complete {
            user.survey_completed = true;
        }
        user.updated_at = crate::time_utils::now_rfc3339();

        // Conversational pass
        let reply = self.gemini.chat_reply(&chat.messages).await?;
        chat.push_message(MessageRole::Assistant, reply);

        // All-or-nothing: neither the chat append nor the characteristics
        // merge becomes visible if anything above failed.
        self.db.commit_survey_turn(uid, &chat, &user).await?;

        tracing::info!(
            uid,
            extracted = extracted_count,
            survey_completed = user.survey_completed,
            "Survey turn processed"
        );

        // Drop the lock entry once no other turn holds or awaits it
        // (map entry + our clone = 2); a later turn re-inserts a fresh one.
        drop(_guard);
        self.turn_locks
            .remove_if(uid, |_, l| Arc::strong_count(l) <= 2);

        Ok(SurveyTurn {
            chat,
            survey_completed: user.survey_completed,
        })
    }

    /// Full survey chat for a user.
    pub async fn get_chat(&self, uid: &str) -> Result<Chat, AppError> {
        let mut chat = self
            .db
            .get_chat(uid)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Survey chat for {} not found", uid)))?;
        chat.sort_messages();
        Ok(chat)
    }
}
