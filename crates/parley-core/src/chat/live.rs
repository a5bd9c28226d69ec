//! Registry of chats with open live sessions.

use dashmap::DashMap;
use parley_types::chat::ChatId;

/// Counts open sessions per chat.
///
/// Shared between the websocket handlers and the background sync
/// scheduler. A chat is present only while its count is above zero.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<ChatId, usize>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new session on `chat_id`. Returns the open session count.
    pub fn register(&self, chat_id: &ChatId) -> usize {
        let mut count = self.sessions.entry(chat_id.clone()).or_insert(0);
        *count += 1;
        *count
    }

    /// Drop one session from `chat_id`.
    ///
    /// Returns `true` when that was the last open session for the chat.
    /// Deregistering a chat with no sessions is a no-op returning `false`.
    pub fn deregister(&self, chat_id: &ChatId) -> bool {
        let removed = self
            .sessions
            .remove_if_mut(chat_id, |_, count| {
                *count = count.saturating_sub(1);
                *count == 0
            });
        removed.is_some()
    }

    pub fn session_count(&self, chat_id: &ChatId) -> usize {
        self.sessions.get(chat_id).map(|c| *c).unwrap_or(0)
    }

    /// Snapshot of the chats that currently have at least one session.
    pub fn active_chats(&self) -> Vec<ChatId> {
        self.sessions.iter().map(|e| e.key().clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_counts_sessions() {
        let registry = SessionRegistry::new();
        let chat = ChatId::from("abc");

        assert_eq!(registry.register(&chat), 1);
        assert_eq!(registry.register(&chat), 2);
        assert_eq!(registry.session_count(&chat), 2);
        assert_eq!(registry.active_chats(), vec![chat]);
    }

    #[test]
    fn test_deregister_reports_last_session() {
        let registry = SessionRegistry::new();
        let chat = ChatId::from("abc");
        registry.register(&chat);
        registry.register(&chat);

        assert!(!registry.deregister(&chat));
        assert!(registry.deregister(&chat));
        assert!(registry.is_empty());
        assert_eq!(registry.session_count(&chat), 0);
    }

    #[test]
    fn test_deregister_unknown_chat() {
        let registry = SessionRegistry::new();
        assert!(!registry.deregister(&ChatId::from("nope")));
    }
}
