//! Session data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Summary reported for a session with no retained history
pub const EMPTY_SUMMARY: &str = "New conversation started.";

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A chat message. Immutable once appended to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message role
    pub role: Role,
    /// Message content
    pub content: String,
    /// Message timestamp
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// Create a new chat message stamped with the current time
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Bookkeeping kept alongside a session's history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMeta {
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
    /// Number of retained messages
    pub message_count: usize,
}

/// One row of `list_sessions`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionInfo {
    pub id: String,
    pub message_count: usize,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
}

/// Aggregate figures across every known session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub total_sessions: usize,
    pub total_messages: usize,
    /// Sessions that currently hold at least one message
    pub active_sessions: Vec<String>,
}

/// A conversation session with a bounded history
#[derive(Debug, Clone)]
pub struct Session {
    /// Session id
    pub id: String,
    messages: VecDeque<ChatMessage>,
    max_messages: usize,
    created_at: DateTime<Utc>,
    last_active_at: DateTime<Utc>,
}

impl Session {
    /// Create an empty session holding at most `max_messages` messages
    pub fn new(id: impl Into<String>, max_messages: usize) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            messages: VecDeque::new(),
            max_messages,
            created_at: now,
            last_active_at: now,
        }
    }

    /// Rebuild a session from already-bounded history
    pub fn from_messages(
        id: impl Into<String>,
        max_messages: usize,
        messages: Vec<ChatMessage>,
        created_at: DateTime<Utc>,
        last_active_at: DateTime<Utc>,
    ) -> Self {
        let mut session = Self {
            id: id.into(),
            messages: messages.into(),
            max_messages,
            created_at,
            last_active_at,
        };
        session.evict_overflow();
        session
    }

    /// Append a message, evicting from the front until within bound.
    /// Returns the number of evicted messages.
    pub fn push(&mut self, message: ChatMessage) -> usize {
        self.touch(message.timestamp);
        self.messages.push_back(message);
        self.evict_overflow()
    }

    fn evict_overflow(&mut self) -> usize {
        let mut evicted = 0;
        while self.messages.len() > self.max_messages {
            self.messages.pop_front();
            evicted += 1;
        }
        evicted
    }

    /// Advance `last_active_at`, never moving it backwards
    pub fn touch(&mut self, at: DateTime<Utc>) {
        if at > self.last_active_at {
            self.last_active_at = at;
        }
    }

    /// Full retained history, oldest first
    pub fn history(&self) -> Vec<ChatMessage> {
        self.messages.iter().cloned().collect()
    }

    /// The last `k` messages, oldest first
    pub fn recent(&self, k: usize) -> Vec<ChatMessage> {
        let start = self.messages.len().saturating_sub(k);
        self.messages.range(start..).cloned().collect()
    }

    /// Clear all messages
    pub fn clear(&mut self) {
        self.messages.clear();
        self.touch(Utc::now());
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn meta(&self) -> SessionMeta {
        SessionMeta {
            created_at: self.created_at,
            last_active_at: self.last_active_at,
            message_count: self.messages.len(),
        }
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.id.clone(),
            message_count: self.messages.len(),
            created_at: self.created_at,
            last_active_at: self.last_active_at,
        }
    }

    pub fn summary(&self) -> String {
        summarize_history(self.messages.iter(), self.created_at)
    }
}

/// Render the human-readable role counts for a session's history
pub fn summarize_history<'a>(
    history: impl IntoIterator<Item = &'a ChatMessage>,
    created_at: DateTime<Utc>,
) -> String {
    let (mut user, mut assistant) = (0usize, 0usize);
    for msg in history {
        match msg.role {
            Role::User => user += 1,
            Role::Assistant => assistant += 1,
        }
    }

    if user + assistant == 0 {
        return EMPTY_SUMMARY.to_string();
    }

    format!(
        "Session: {} user messages, {} AI responses. Started: {}",
        user,
        assistant,
        created_at.to_rfc3339()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_creation() {
        let session = Session::new("session_093000", 50);
        assert_eq!(session.id, "session_093000");
        assert!(session.is_empty());
        assert_eq!(session.meta().message_count, 0);
    }

    #[test]
    fn test_push_evicts_oldest_first() {
        let mut session = Session::new("test", 3);
        for i in 0..5 {
            session.push(ChatMessage::new(Role::User, format!("Message {}", i)));
        }

        let history = session.history();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].content, "Message 2");
        assert_eq!(history[2].content, "Message 4");
        assert_eq!(session.meta().message_count, 3);
    }

    #[test]
    fn test_eviction_ignores_role() {
        let mut session = Session::new("test", 2);
        session.push(ChatMessage::new(Role::User, "q1"));
        session.push(ChatMessage::new(Role::Assistant, "a1"));
        let evicted = session.push(ChatMessage::new(Role::Assistant, "a2"));

        assert_eq!(evicted, 1);
        let roles: Vec<Role> = session.history().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::Assistant, Role::Assistant]);
    }

    #[test]
    fn test_recent() {
        let mut session = Session::new("test", 50);
        for i in 0..10 {
            session.push(ChatMessage::new(Role::User, format!("Message {}", i)));
        }

        let recent = session.recent(3);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].content, "Message 7");
        assert_eq!(session.recent(100).len(), 10);
        assert!(session.recent(0).is_empty());
    }

    #[test]
    fn test_touch_is_monotonic() {
        let mut session = Session::new("test", 5);
        let before = session.meta().last_active_at;
        session.touch(before - chrono::Duration::seconds(30));
        assert_eq!(session.meta().last_active_at, before);
    }

    #[test]
    fn test_summary() {
        let mut session = Session::new("test", 10);
        assert_eq!(session.summary(), EMPTY_SUMMARY);

        session.push(ChatMessage::new(Role::User, "Hello"));
        session.push(ChatMessage::new(Role::Assistant, "Hi there!"));
        let summary = session.summary();
        assert!(summary.starts_with("Session: 1 user messages, 1 AI responses."));
    }

    #[test]
    fn test_message_wire_format() {
        let msg = ChatMessage::new(Role::Assistant, "Hi");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["role"], "assistant");
        assert_eq!(value["content"], "Hi");
        assert!(value["timestamp"].is_string());
    }
}
