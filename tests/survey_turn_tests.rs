// SPDX-License-Identifier: MIT

//! Survey turn pipeline tests.
//!
//! These run the full turn against the Firestore emulator with a stub
//! Gemini server, so they cover the extraction merge, the atomic commit
//! and the per-user turn serialization. Skipped when
//! FIRESTORE_EMULATOR_HOST is not set.

use axum::{Json, Router};
use roomly_api::models::MessageRole;
use roomly_api::models::User;
use roomly_api::services::survey::TurnLocks;
use roomly_api::services::{GeminiClient, SurveyService};
use serde_json::{json, Value};
use std::sync::Arc;

mod common;

/// Stub Gemini endpoint: extraction calls (the ones carrying a toolConfig)
/// get a function call with the given args, conversational calls get text.
fn stub_gemini(extraction_args: Value) -> Router {
    Router::new().fallback(move |Json(body): Json<Value>| {
        let args = extraction_args.clone();
        async move {
            if body.get("toolConfig").is_some() {
                Json(json!({
                    "candidates": [{
                        "content": {
                            "parts": [{
                                "functionCall": {
                                    "name": "record_roommate_preferences",
                                    "args": args
                                }
                            }]
                        }
                    }]
                }))
            } else {
                Json(json!({
                    "candidates": [{
                        "content": {
                            "parts": [{ "text": "Thanks! Tell me more." }]
                        }
                    }]
                }))
            }
        }
    })
}

async fn stub_survey_service(
    db: roomly_api::db::FirestoreDb,
    extraction_args: Value,
) -> (SurveyService, TurnLocks) {
    let base_url = common::spawn_stub_server(stub_gemini(extraction_args)).await;
    let gemini =
        GeminiClient::new("test-key".to_string(), "gemini-test".to_string()).with_base_url(base_url);
    let locks: TurnLocks = Arc::new(dashmap::DashMap::new());
    (SurveyService::new(db, gemini, locks.clone()), locks)
}

fn unique_uid(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4())
}

#[tokio::test]
async fn test_turn_appends_messages_and_merges_characteristics() {
    require_emulator!();
    let db = common::test_db().await;
    let uid = unique_uid("turn-merge");
    db.upsert_user(&User::new(uid.clone(), None, None))
        .await
        .expect("seed user");

    let (service, locks) = stub_survey_service(
        db.clone(),
        json!({ "pets": "cat", "monthly_budget": 1200, "survey_complete": false }),
    )
    .await;

    let turn = service
        .run_turn(&uid, "I have a cat and my budget is 1200".to_string())
        .await
        .expect("turn should succeed");

    assert_eq!(turn.chat.messages.len(), 2);
    assert_eq!(turn.chat.messages[0].role, MessageRole::User);
    assert_eq!(turn.chat.messages[1].role, MessageRole::Assistant);
    assert_eq!(turn.chat.messages[1].content, "Thanks! Tell me more.");
    assert!(!turn.survey_completed);

    // Both documents landed: the chat append and the characteristics merge
    let stored_chat = db.get_chat(&uid).await.unwrap().expect("chat persisted");
    assert_eq!(stored_chat.messages.len(), 2);

    let stored_user = db.get_user(&uid).await.unwrap().expect("user persisted");
    assert_eq!(stored_user.characteristics.get("pets"), Some(&json!("cat")));
    assert_eq!(
        stored_user.characteristics.get("monthly_budget"),
        Some(&json!(1200))
    );
    assert!(!stored_user.survey_completed);

    // The lock entry is swept once the turn is done
    assert!(!locks.contains_key(&uid));

    db.delete_user_data(&uid).await.expect("cleanup");
}

#[tokio::test]
async fn test_survey_complete_flag_sets_user() {
    require_emulator!();
    let db = common::test_db().await;
    let uid = unique_uid("turn-complete");
    db.upsert_user(&User::new(uid.clone(), None, None))
        .await
        .expect("seed user");

    let (service, _locks) = stub_survey_service(
        db.clone(),
        json!({ "cleanliness": "tidy", "survey_complete": true }),
    )
    .await;

    let turn = service
        .run_turn(&uid, "That covers everything".to_string())
        .await
        .expect("turn should succeed");
    assert!(turn.survey_completed);

    let stored_user = db.get_user(&uid).await.unwrap().expect("user persisted");
    assert!(stored_user.survey_completed);
    // The completion flag is a signal, not a characteristic
    assert!(!stored_user.characteristics.contains_key("survey_complete"));
    assert_eq!(
        stored_user.characteristics.get("cleanliness"),
        Some(&json!("tidy"))
    );

    db.delete_user_data(&uid).await.expect("cleanup");
}

#[tokio::test]
async fn test_concurrent_turns_for_one_user_serialize() {
    require_emulator!();
    let db = common::test_db().await;
    let uid = unique_uid("turn-race");
    db.upsert_user(&User::new(uid.clone(), None, None))
        .await
        .expect("seed user");

    let (service, locks) =
        stub_survey_service(db.clone(), json!({ "smoking": "never" })).await;

    let (a, b) = tokio::join!(
        service.run_turn(&uid, "first message".to_string()),
        service.run_turn(&uid, "second message".to_string()),
    );
    a.expect("first turn");
    b.expect("second turn");

    // Serialized turns: four messages, no reused sequence numbers, and
    // both user messages survived the read-modify-write.
    let mut chat = db.get_chat(&uid).await.unwrap().expect("chat persisted");
    chat.sort_messages();
    assert_eq!(chat.messages.len(), 4);

    let seqs: Vec<u32> = chat.messages.iter().map(|m| m.seq).collect();
    assert_eq!(seqs, vec![0, 1, 2, 3]);

    let user_contents: Vec<&str> = chat
        .messages
        .iter()
        .filter(|m| m.role == MessageRole::User)
        .map(|m| m.content.as_str())
        .collect();
    assert_eq!(user_contents.len(), 2);
    assert!(user_contents.contains(&"first message"));
    assert!(user_contents.contains(&"second message"));

    assert!(!locks.contains_key(&uid));

    db.delete_user_data(&uid).await.expect("cleanup");
}

#[tokio::test]
async fn test_turn_for_unknown_user_is_not_found() {
    require_emulator!();
    let db = common::test_db().await;

    let (service, _locks) = stub_survey_service(db, json!({})).await;

    let result = service
        .run_turn(&unique_uid("never-created"), "hello".to_string())
        .await;
    assert!(matches!(
        result,
        Err(roomly_api::error::AppError::NotFound(_))
    ));
}
