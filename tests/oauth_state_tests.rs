// SPDX-License-Identifier: MIT

//! Signed OAuth state parameter tests.

use roomly_api::routes::square::{sign_state, verify_and_decode_state};

const SECRET: &[u8] = b"test_oauth_state_key";

#[test]
fn test_round_trip_preserves_uid() {
    let state = sign_state("firebase-uid-abc123", SECRET).unwrap();
    assert_eq!(
        verify_and_decode_state(&state, SECRET),
        Some("firebase-uid-abc123".to_string())
    );
}

#[test]
fn test_state_is_url_safe() {
    let state = sign_state("uid-with+special/chars", SECRET).unwrap();
    assert!(state
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
}

#[test]
fn test_tampered_uid_rejected() {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

    let state = sign_state("user-a", SECRET).unwrap();
    let decoded = String::from_utf8(URL_SAFE_NO_PAD.decode(&state).unwrap()).unwrap();

    // Swap the uid but keep the original signature
    let tampered = decoded.replacen("user-a", "user-b", 1);
    let reencoded = URL_SAFE_NO_PAD.encode(tampered.as_bytes());

    assert_eq!(verify_and_decode_state(&reencoded, SECRET), None);
}

#[test]
fn test_wrong_secret_rejected() {
    let state = sign_state("user-a", SECRET).unwrap();
    assert_eq!(verify_and_decode_state(&state, b"different_key"), None);
}

#[test]
fn test_garbage_input_rejected() {
    assert_eq!(verify_and_decode_state("", SECRET), None);
    assert_eq!(verify_and_decode_state("%%%not-base64%%%", SECRET), None);

    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
    let missing_parts = URL_SAFE_NO_PAD.encode(b"only-a-uid");
    assert_eq!(verify_and_decode_state(&missing_parts, SECRET), None);
}

#[test]
fn test_distinct_uids_produce_distinct_states() {
    let a = sign_state("user-a", SECRET).unwrap();
    let b = sign_state("user-b", SECRET).unwrap();
    assert_ne!(a, b);
}
