//! In-process session store

use super::store::{ChatMessage, Role, Session, SessionInfo, SessionMeta};
use super::{check_bound, check_session_id, sort_sessions, SessionStore};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Keeps every session in memory; all data is lost when the process exits.
///
/// The session map sits behind a read-write lock and each session behind its
/// own mutex, held only while a single operation runs.
#[derive(Debug)]
pub struct VolatileStore {
    max_history: usize,
    sessions: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
    current: RwLock<Option<String>>,
}

impl VolatileStore {
    /// Create an empty store retaining at most `max_history` messages per session
    pub fn new(max_history: usize) -> crate::Result<Self> {
        check_bound(max_history)?;
        Ok(Self {
            max_history,
            sessions: RwLock::new(HashMap::new()),
            current: RwLock::new(None),
        })
    }

    fn session(&self, session_id: &str) -> Option<Arc<Mutex<Session>>> {
        self.sessions.read().get(session_id).cloned()
    }

    fn session_or_create(&self, session_id: &str) -> Arc<Mutex<Session>> {
        if let Some(session) = self.session(session_id) {
            return session;
        }

        let mut sessions = self.sessions.write();
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                debug!("Creating in-memory session {}", session_id);
                Arc::new(Mutex::new(Session::new(session_id, self.max_history)))
            })
            .clone()
    }
}

impl SessionStore for VolatileStore {
    fn max_history(&self) -> usize {
        self.max_history
    }

    fn append(&self, session_id: &str, role: Role, content: &str) -> crate::Result<ChatMessage> {
        check_session_id(session_id)?;
        let session = self.session_or_create(session_id);
        let message = ChatMessage::new(role, content);

        let evicted = session.lock().push(message.clone());
        if evicted > 0 {
            debug!("Evicted {} message(s) from session {}", evicted, session_id);
        }
        Ok(message)
    }

    fn history(&self, session_id: &str) -> crate::Result<Vec<ChatMessage>> {
        Ok(self
            .session(session_id)
            .map(|s| s.lock().history())
            .unwrap_or_default())
    }

    fn recent(&self, session_id: &str, k: usize) -> crate::Result<Vec<ChatMessage>> {
        Ok(self
            .session(session_id)
            .map(|s| s.lock().recent(k))
            .unwrap_or_default())
    }

    fn get_or_create(&self, session_id: &str) -> crate::Result<SessionMeta> {
        check_session_id(session_id)?;
        Ok(self.session_or_create(session_id).lock().meta())
    }

    fn switch(&self, session_id: &str) -> crate::Result<SessionMeta> {
        let meta = self.get_or_create(session_id)?;
        *self.current.write() = Some(session_id.to_string());
        debug!("Switched to session {}", session_id);
        Ok(meta)
    }

    fn current(&self) -> Option<String> {
        self.current.read().clone()
    }

    fn list_sessions(&self) -> crate::Result<Vec<SessionInfo>> {
        let mut sessions: Vec<SessionInfo> = self
            .sessions
            .read()
            .values()
            .map(|s| s.lock().info())
            .collect();
        sort_sessions(&mut sessions);
        Ok(sessions)
    }

    fn clear(&self, session_id: &str) -> crate::Result<()> {
        check_session_id(session_id)?;
        self.session_or_create(session_id).lock().clear();
        Ok(())
    }

    fn delete(&self, session_id: &str) -> crate::Result<bool> {
        let removed = self.sessions.write().remove(session_id).is_some();
        let mut current = self.current.write();
        if current.as_deref() == Some(session_id) {
            *current = None;
        }
        Ok(removed)
    }

    fn summarize(&self, session_id: &str) -> crate::Result<String> {
        Ok(self
            .session(session_id)
            .map(|s| s.lock().summary())
            .unwrap_or_else(|| super::EMPTY_SUMMARY.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::EMPTY_SUMMARY;

    #[test]
    fn test_zero_bound_fails_fast() {
        let err = VolatileStore::new(0).unwrap_err();
        assert!(err.to_string().contains("max_history"));
    }

    #[test]
    fn test_unknown_session_is_empty_and_not_created() {
        let store = VolatileStore::new(5).unwrap();
        assert!(store.history("nobody").unwrap().is_empty());
        assert!(store.recent("nobody", 3).unwrap().is_empty());
        assert_eq!(store.summarize("nobody").unwrap(), EMPTY_SUMMARY);
        assert!(store.list_sessions().unwrap().is_empty());
    }

    #[test]
    fn test_append_creates_session() {
        let store = VolatileStore::new(5).unwrap();
        let msg = store.append("s1", Role::User, "Hello").unwrap();
        assert_eq!(msg.role, Role::User);

        let history = store.history("s1").unwrap();
        assert_eq!(history, vec![msg]);
        assert_eq!(store.list_sessions().unwrap()[0].message_count, 1);
    }

    #[test]
    fn test_bound_plus_one_evicts_first() {
        let store = VolatileStore::new(3).unwrap();
        for i in 1..=4 {
            store.append("s", Role::User, &format!("m{}", i)).unwrap();
        }

        let contents: Vec<String> = store
            .history("s")
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, vec!["m2", "m3", "m4"]);
    }

    #[test]
    fn test_switch_and_current() {
        let store = VolatileStore::new(5).unwrap();
        assert!(store.current().is_none());

        let meta = store.switch("work").unwrap();
        assert_eq!(meta.message_count, 0);
        assert_eq!(store.current().as_deref(), Some("work"));
        assert_eq!(store.list_sessions().unwrap().len(), 1);
    }

    #[test]
    fn test_clear_keeps_session_listed() {
        let store = VolatileStore::new(5).unwrap();
        store.append("s", Role::User, "a").unwrap();
        store.append("s", Role::Assistant, "b").unwrap();
        store.clear("s").unwrap();

        assert!(store.history("s").unwrap().is_empty());
        let sessions = store.list_sessions().unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id, "s");
        assert_eq!(sessions[0].message_count, 0);
    }

    #[test]
    fn test_delete_unsets_current() {
        let store = VolatileStore::new(5).unwrap();
        store.switch("gone").unwrap();
        assert!(store.delete("gone").unwrap());
        assert!(!store.delete("gone").unwrap());
        assert!(store.current().is_none());
    }

    #[test]
    fn test_concurrent_appends_respect_bound() {
        let store = Arc::new(VolatileStore::new(20).unwrap());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..25 {
                        store
                            .append("shared", Role::User, &format!("{}-{}", t, i))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.history("shared").unwrap().len(), 20);
        assert_eq!(store.list_sessions().unwrap()[0].message_count, 20);
    }
}
