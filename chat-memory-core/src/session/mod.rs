//! Session memory: bounded, session-keyed conversation history
//!
//! Two stores share the [`SessionStore`] contract. [`VolatileStore`] keeps
//! everything in process memory. [`DurableStore`] keeps one JSON file per
//! session and re-reads it on every call.
//!
//! Unknown session ids are never an error: reads return an empty history,
//! and `append`/`switch` create the session through `get_or_create`. The
//! empty id is rejected by every operation that would create a session.

pub mod durable;
pub mod store;
pub mod volatile;

pub use durable::DurableStore;
pub use store::{
    summarize_history, ChatMessage, Role, Session, SessionInfo, SessionMeta, StoreStats,
    EMPTY_SUMMARY,
};
pub use volatile::VolatileStore;

use crate::config::{MemoryBackend, MemoryConfig};
use crate::utils::expand_tilde;
use std::sync::Arc;

/// Contract shared by the volatile and durable session stores.
///
/// Every operation takes `&self`; implementations synchronise internally so a
/// store can be shared behind an `Arc` between the agent and the command loop.
pub trait SessionStore: Send + Sync {
    /// Maximum retained messages per session
    fn max_history(&self) -> usize;

    /// Append a message stamped with the current time, creating the session
    /// if needed and evicting the oldest messages beyond the bound
    fn append(&self, session_id: &str, role: Role, content: &str) -> crate::Result<ChatMessage>;

    /// Full retained history, oldest first. Empty for unknown sessions.
    fn history(&self, session_id: &str) -> crate::Result<Vec<ChatMessage>>;

    /// The last `k` messages (fewer if the history is shorter), oldest first
    fn recent(&self, session_id: &str, k: usize) -> crate::Result<Vec<ChatMessage>> {
        let history = self.history(session_id)?;
        let start = history.len().saturating_sub(k);
        Ok(history[start..].to_vec())
    }

    /// Return the session's metadata, registering it with an empty history
    /// if it was not known yet
    fn get_or_create(&self, session_id: &str) -> crate::Result<SessionMeta>;

    /// Make `session_id` the active session, creating it if absent
    fn switch(&self, session_id: &str) -> crate::Result<SessionMeta>;

    /// The active session id, if one was selected
    fn current(&self) -> Option<String>;

    /// Every known session, most recently active first
    fn list_sessions(&self) -> crate::Result<Vec<SessionInfo>>;

    /// Drop all messages but keep the session registered
    fn clear(&self, session_id: &str) -> crate::Result<()>;

    /// Forget the session entirely. Returns whether it existed.
    fn delete(&self, session_id: &str) -> crate::Result<bool>;

    /// Role counts for the session, or [`EMPTY_SUMMARY`]
    fn summarize(&self, session_id: &str) -> crate::Result<String>;

    /// Totals across all sessions
    fn stats(&self) -> crate::Result<StoreStats> {
        let sessions = self.list_sessions()?;
        Ok(StoreStats {
            total_sessions: sessions.len(),
            total_messages: sessions.iter().map(|s| s.message_count).sum(),
            active_sessions: sessions
                .iter()
                .filter(|s| s.message_count > 0)
                .map(|s| s.id.clone())
                .collect(),
        })
    }
}

/// Build the store selected by `config`
pub fn open_store(config: &MemoryConfig) -> crate::Result<Arc<dyn SessionStore>> {
    match config.backend {
        MemoryBackend::Volatile => Ok(Arc::new(VolatileStore::new(config.max_history)?)),
        MemoryBackend::Durable => Ok(Arc::new(DurableStore::new(
            expand_tilde(&config.storage_dir),
            config.max_history,
        )?)),
    }
}

/// Reject a bound that could never hold a message
pub(crate) fn check_bound(max_history: usize) -> crate::Result<()> {
    if max_history == 0 {
        return Err(crate::Error::Config(
            "max_history must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

/// Session ids are any non-empty text
pub(crate) fn check_session_id(session_id: &str) -> crate::Result<()> {
    if session_id.is_empty() {
        return Err(crate::Error::Validation(
            "session id must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Most recently active first, ties broken by id so listings are stable
pub(crate) fn sort_sessions(sessions: &mut [SessionInfo]) {
    sessions.sort_by(|a, b| {
        b.last_active_at
            .cmp(&a.last_active_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}
