//! Survey chat document: one chat per user, ordered messages.

use serde::{Deserialize, Serialize};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// A single chat message.
///
/// `seq` is the sort key. The previous incarnation used millisecond
/// timestamps as both id and sort key, which collided for two messages in
/// the same millisecond; ids are now opaque uuids and ordering is explicit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    /// Position within the chat, strictly increasing
    pub seq: u32,
    pub role: MessageRole,
    pub content: String,
    /// RFC3339 creation time (informational, not the sort key)
    pub created_at: String,
}

/// Survey chat stored in Firestore (document ID = uid).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    pub created_at: String,
    pub updated_at: String,
}

impl Chat {
    /// A new empty chat for a user.
    pub fn new() -> Self {
        let now = crate::time_utils::now_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            messages: Vec::new(),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Append a message with the next sequence number.
    pub fn push_message(&mut self, role: MessageRole, content: String) -> &Message {
        let seq = self.next_seq();
        self.messages.push(Message {
            id: uuid::Uuid::new_v4().to_string(),
            seq,
            role,
            content,
            created_at: crate::time_utils::now_rfc3339(),
        });
        self.updated_at = crate::time_utils::now_rfc3339();
        self.messages.last().expect("just pushed")
    }

    /// Next sequence number (one past the current maximum, so a document
    /// with out-of-order writes still never reuses a seq).
    fn next_seq(&self) -> u32 {
        self.messages.iter().map(|m| m.seq + 1).max().unwrap_or(0)
    }

    /// Sort messages by their sequence number.
    pub fn sort_messages(&mut self) {
        self.messages.sort_by_key(|m| m.seq);
    }

    /// The last `n` messages in order.
    pub fn recent_messages(&self, n: usize) -> Vec<Message> {
        let mut sorted = self.messages.clone();
        sorted.sort_by_key(|m| m.seq);
        let skip = sorted.len().saturating_sub(n);
        sorted.into_iter().skip(skip).collect()
    }
}

impl Default for Chat {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_assigns_monotonic_seq() {
        let mut chat = Chat::new();
        chat.push_message(MessageRole::User, "hi".to_string());
        chat.push_message(MessageRole::Assistant, "hello".to_string());
        chat.push_message(MessageRole::User, "tell me more".to_string());

        let seqs: Vec<u32> = chat.messages.iter().map(|m| m.seq).collect();
        assert_eq!(seqs, vec![0, 1, 2]);

        let ids: std::collections::HashSet<&String> =
            chat.messages.iter().map(|m| &m.id).collect();
        assert_eq!(ids.len(), 3, "message ids must be unique");
    }

    #[test]
    fn next_seq_survives_unsorted_documents() {
        let mut chat = Chat::new();
        chat.push_message(MessageRole::User, "a".to_string());
        chat.push_message(MessageRole::Assistant, "b".to_string());
        chat.messages.swap(0, 1);

        chat.push_message(MessageRole::User, "c".to_string());
        assert_eq!(chat.messages.last().unwrap().seq, 2);
    }

    #[test]
    fn recent_messages_returns_last_n_in_order() {
        let mut chat = Chat::new();
        for i in 0..7 {
            chat.push_message(MessageRole::User, format!("m{}", i));
        }
        chat.messages.reverse(); // simulate unordered storage

        let recent = chat.recent_messages(5);
        assert_eq!(recent.len(), 5);
        let seqs: Vec<u32> = recent.iter().map(|m| m.seq).collect();
        assert_eq!(seqs, vec![2, 3, 4, 5, 6]);
    }
}
