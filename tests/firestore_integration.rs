// SPDX-License-Identifier: MIT

//! Firestore integration tests.
//!
//! These run against the Firestore emulator and are skipped when
//! FIRESTORE_EMULATOR_HOST is not set.

use roomly_api::models::{Chat, MessageRole, User};
use serde_json::json;

mod common;

fn unique_uid(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4())
}

#[tokio::test]
async fn test_user_round_trip() {
    require_emulator!();
    let db = common::test_db().await;
    let uid = unique_uid("user-rt");

    let mut user = User::new(
        uid.clone(),
        Some("test@example.com".to_string()),
        Some("Test User".to_string()),
    );
    user.zip_code = Some("94040".to_string());
    user.on_boarded = true;

    db.upsert_user(&user).await.expect("upsert should succeed");

    let fetched = db
        .get_user(&uid)
        .await
        .expect("get should succeed")
        .expect("user should exist");

    assert_eq!(fetched.uid, uid);
    assert_eq!(fetched.email.as_deref(), Some("test@example.com"));
    assert_eq!(fetched.zip_code.as_deref(), Some("94040"));
    assert!(fetched.on_boarded);
    assert!(!fetched.survey_completed);

    db.delete_user_data(&uid).await.expect("cleanup");
}

#[tokio::test]
async fn test_missing_user_is_none() {
    require_emulator!();
    let db = common::test_db().await;

    let fetched = db
        .get_user(&unique_uid("never-created"))
        .await
        .expect("get should succeed");
    assert!(fetched.is_none());
}

#[tokio::test]
async fn test_chat_round_trip_preserves_order() {
    require_emulator!();
    let db = common::test_db().await;
    let uid = unique_uid("chat-rt");

    let mut chat = Chat::new();
    chat.push_message(MessageRole::User, "hi".to_string());
    chat.push_message(MessageRole::Assistant, "hello!".to_string());
    chat.push_message(MessageRole::User, "I like quiet mornings".to_string());

    db.set_chat(&uid, &chat).await.expect("set should succeed");

    let mut fetched = db
        .get_chat(&uid)
        .await
        .expect("get should succeed")
        .expect("chat should exist");
    fetched.sort_messages();

    assert_eq!(fetched.messages.len(), 3);
    let seqs: Vec<u32> = fetched.messages.iter().map(|m| m.seq).collect();
    assert_eq!(seqs, vec![0, 1, 2]);
    assert_eq!(fetched.messages[2].content, "I like quiet mornings");

    db.delete_user_data(&uid).await.expect("cleanup");
}

#[tokio::test]
async fn test_commit_survey_turn_writes_both_documents() {
    require_emulator!();
    let db = common::test_db().await;
    let uid = unique_uid("turn");

    let mut user = User::new(uid.clone(), None, None);
    db.upsert_user(&user).await.expect("seed user");

    let mut chat = Chat::new();
    chat.push_message(MessageRole::User, "I have a cat".to_string());
    chat.push_message(MessageRole::Assistant, "Noted!".to_string());

    let mut extracted = serde_json::Map::new();
    extracted.insert("pets".to_string(), json!("cat"));
    user.merge_characteristics(extracted);

    db.commit_survey_turn(&uid, &chat, &user)
        .await
        .expect("commit should succeed");

    let fetched_chat = db.get_chat(&uid).await.unwrap().expect("chat written");
    assert_eq!(fetched_chat.messages.len(), 2);

    let fetched_user = db.get_user(&uid).await.unwrap().expect("user written");
    assert_eq!(fetched_user.characteristics.get("pets"), Some(&json!("cat")));

    db.delete_user_data(&uid).await.expect("cleanup");
}

#[tokio::test]
async fn test_characteristics_merge_keeps_existing_keys() {
    require_emulator!();
    let db = common::test_db().await;
    let uid = unique_uid("merge");

    let mut user = User::new(uid.clone(), None, None);
    let mut first = serde_json::Map::new();
    first.insert("smoking".to_string(), json!("never"));
    user.merge_characteristics(first);
    db.upsert_user(&user).await.expect("seed");

    let mut fetched = db.get_user(&uid).await.unwrap().unwrap();
    let mut second = serde_json::Map::new();
    second.insert("cleanliness".to_string(), json!("tidy"));
    second.insert("smoking".to_string(), json!(null)); // null never overwrites
    fetched.merge_characteristics(second);
    db.upsert_user(&fetched).await.expect("update");

    let final_user = db.get_user(&uid).await.unwrap().unwrap();
    assert_eq!(final_user.characteristics.get("smoking"), Some(&json!("never")));
    assert_eq!(
        final_user.characteristics.get("cleanliness"),
        Some(&json!("tidy"))
    );

    db.delete_user_data(&uid).await.expect("cleanup");
}

#[tokio::test]
async fn test_delete_user_data_removes_everything() {
    require_emulator!();
    let db = common::test_db().await;
    let uid = unique_uid("delete");

    let user = User::new(uid.clone(), None, None);
    db.upsert_user(&user).await.expect("seed user");
    let mut chat = Chat::new();
    chat.push_message(MessageRole::User, "bye".to_string());
    db.set_chat(&uid, &chat).await.expect("seed chat");

    let deleted = db.delete_user_data(&uid).await.expect("delete");
    assert_eq!(deleted, 2);

    assert!(db.get_user(&uid).await.unwrap().is_none());
    assert!(db.get_chat(&uid).await.unwrap().is_none());
}

#[tokio::test]
async fn test_offline_mock_reports_database_error() {
    // No emulator needed: the offline mock fails every operation.
    let db = common::test_db_offline();
    let result = db.get_user("anyone").await;
    assert!(matches!(
        result,
        Err(roomly_api::error::AppError::Database(_))
    ));
}
