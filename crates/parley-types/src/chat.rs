//! Chat identity, message, and record types.
//!
//! The same `ChatRecord` shape is persisted by the durable and the volatile
//! store; the graph store only knows the `ChatSummary` projection. JSON field
//! names are the wire names shared by the REST API and both document stores.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;

/// Identity of a chat, minted by the relationship store at creation time.
///
/// Opaque to everything except the store that minted it. It is the join key
/// across all three stores and never changes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub String);

impl ChatId {
    /// Mint a fresh time-sortable identity (UUID v7).
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ChatId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ChatId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identity of an external person node that participates in chats.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonId(pub String);

impl PersonId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for PersonId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PersonId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A single chat message. Immutable once created.
///
/// `id` is assigned when the message enters the system; records written
/// before ids existed carry none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(rename = "date", alias = "timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "personElementId", alias = "senderId", default)]
    pub sender_id: String,
    pub body: String,
}

impl Message {
    /// Build a message stamped with the current time and no id.
    pub fn now(sender_id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: None,
            timestamp: Utc::now(),
            sender_id: sender_id.into(),
            body: body.into(),
        }
    }
}

/// Creation metadata for a new chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMeta {
    #[serde(rename = "dateCreated", default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "isActive", default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Default for ChatMeta {
    fn default() -> Self {
        Self {
            created_at: None,
            active: true,
        }
    }
}

/// A chat as persisted by the durable and the volatile store.
///
/// The durable copy is the system of record; the volatile copy holds the
/// recent, possibly unsynced, messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRecord {
    pub id: ChatId,
    /// Stamped with the current time by the store on create when unset.
    #[serde(rename = "dateCreated", default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "isActive", default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl ChatRecord {
    /// Empty record for a freshly minted identity.
    pub fn new(id: ChatId, meta: &ChatMeta) -> Self {
        Self {
            id,
            created_at: meta.created_at,
            active: meta.active,
            messages: Vec::new(),
        }
    }
}

/// Graph-node view of a chat, as returned by participant lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSummary {
    #[serde(rename = "elementId")]
    pub id: ChatId,
    #[serde(rename = "dateCreated")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "isActive")]
    pub active: bool,
}

/// A person-to-chat edge, used by link and unlink requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantLink {
    #[serde(rename = "personElementId")]
    pub person_id: PersonId,
    #[serde(rename = "chatElementId")]
    pub chat_id: ChatId,
}

/// Outcome of a single sync run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub chat_id: ChatId,
    /// Durable messages before the merge.
    pub durable_before: usize,
    /// Volatile messages read for the merge.
    pub volatile_seen: usize,
    /// Messages new to the durable store.
    pub added: usize,
    /// Durable messages after the merge.
    pub total: usize,
    /// Volatile messages dropped after the merge (trim retention only).
    pub trimmed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_wire_names() {
        let msg = Message {
            id: None,
            timestamp: "2024-05-01T10:00:00Z".parse().unwrap(),
            sender_id: "u1".to_string(),
            body: "hi".to_string(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["date"], "2024-05-01T10:00:00Z");
        assert_eq!(json["personElementId"], "u1");
        assert!(json.get("id").is_none());
    }

    #[test]
    fn test_message_accepts_aliases() {
        let msg: Message = serde_json::from_str(
            r#"{"timestamp":"2024-05-01T10:00:00Z","senderId":"u2","body":"yo"}"#,
        )
        .unwrap();
        assert_eq!(msg.sender_id, "u2");
        assert_eq!(msg.body, "yo");
    }

    #[test]
    fn test_chat_meta_defaults_to_active() {
        let meta: ChatMeta = serde_json::from_str("{}").unwrap();
        assert!(meta.active);
        assert!(meta.created_at.is_none());
    }

    #[test]
    fn test_chat_record_missing_messages_is_empty() {
        let record: ChatRecord =
            serde_json::from_str(r#"{"id":"abc","dateCreated":null,"isActive":false}"#).unwrap();
        assert_eq!(record.id, ChatId::from("abc"));
        assert!(!record.active);
        assert!(record.messages.is_empty());
    }

    #[test]
    fn test_participant_link_wire_names() {
        let link: ParticipantLink =
            serde_json::from_str(r#"{"personElementId":"p1","chatElementId":"c1"}"#).unwrap();
        assert_eq!(link.person_id.as_str(), "p1");
        assert_eq!(link.chat_id.as_str(), "c1");
    }

    #[test]
    fn test_chat_id_is_transparent() {
        let id = ChatId::from("abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
    }
}
