//! File-backed session store
//!
//! Each session is one `<encoded id>.json` file holding a JSON array of messages,
//! oldest first. Nothing is cached: every read goes to disk, and every write
//! rewrites the whole file under that session's write lock.

use super::store::{summarize_history, ChatMessage, Role, SessionInfo, SessionMeta};
use super::{check_bound, check_session_id, sort_sessions, SessionStore};
use crate::utils::{decode_session_id, encode_session_id};
use crate::Error;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Session store persisting one JSON file per session
#[derive(Debug)]
pub struct DurableStore {
    /// Sessions directory
    sessions_dir: PathBuf,
    max_history: usize,
    /// One writer per session file at a time. Entries are dropped again by
    /// `delete` once no other caller holds them.
    write_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    current: RwLock<Option<String>>,
}

impl DurableStore {
    /// Open (and create if needed) a store rooted at `sessions_dir`
    pub fn new<P: AsRef<Path>>(sessions_dir: P, max_history: usize) -> crate::Result<Self> {
        check_bound(max_history)?;
        let sessions_dir = sessions_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&sessions_dir).map_err(|e| Error::storage(&sessions_dir, e))?;

        Ok(Self {
            sessions_dir,
            max_history,
            write_locks: Mutex::new(HashMap::new()),
            current: RwLock::new(None),
        })
    }

    /// The directory holding the session files
    pub fn sessions_dir(&self) -> &Path {
        &self.sessions_dir
    }

    /// Get the file path for a session
    pub fn session_path(&self, session_id: &str) -> PathBuf {
        self.sessions_dir
            .join(format!("{}.json", encode_session_id(session_id)))
    }

    fn write_lock(&self, session_id: &str) -> Arc<Mutex<()>> {
        self.write_locks
            .lock()
            .entry(session_id.to_string())
            .or_default()
            .clone()
    }

    /// Read a session file. `None` when the file does not exist.
    fn read_messages(&self, path: &Path) -> crate::Result<Option<Vec<ChatMessage>>> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::storage(path, e)),
        };

        let mut messages: Vec<ChatMessage> = serde_json::from_str(&content)
            .map_err(|e| Error::storage(path, format!("malformed session file: {}", e)))?;

        // A file written under a larger bound is trimmed on the way out
        let overflow = messages.len().saturating_sub(self.max_history);
        if overflow > 0 {
            messages.drain(..overflow);
        }
        Ok(Some(messages))
    }

    /// Replace a session file: write a sibling temp file, then rename it over
    /// the target so readers never observe a half-written array.
    fn write_messages(&self, path: &Path, messages: &[ChatMessage]) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(messages)?;
        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, content).map_err(|e| Error::storage(&tmp_path, e))?;
        if let Err(e) = std::fs::rename(&tmp_path, path) {
            if let Err(cleanup) = std::fs::remove_file(&tmp_path) {
                warn!("Failed to remove {}: {}", tmp_path.display(), cleanup);
            }
            return Err(Error::storage(path, e));
        }
        Ok(())
    }

    fn modified_at(&self, path: &Path) -> crate::Result<DateTime<Utc>> {
        let modified = std::fs::metadata(path)
            .and_then(|m| m.modified())
            .map_err(|e| Error::storage(path, e))?;
        Ok(DateTime::<Utc>::from(modified))
    }

    /// Metadata derived from the file: `created_at` is the oldest retained
    /// message (or the file time when empty), `last_active_at` the later of
    /// the newest message and the last write.
    fn meta_for(&self, path: &Path, messages: &[ChatMessage]) -> crate::Result<SessionMeta> {
        let modified = self.modified_at(path)?;
        let created_at = messages.first().map(|m| m.timestamp).unwrap_or(modified);
        let last_active_at = messages
            .last()
            .map(|m| m.timestamp.max(modified))
            .unwrap_or(modified);

        Ok(SessionMeta {
            created_at,
            last_active_at,
            message_count: messages.len(),
        })
    }
}

impl SessionStore for DurableStore {
    fn max_history(&self) -> usize {
        self.max_history
    }

    fn append(&self, session_id: &str, role: Role, content: &str) -> crate::Result<ChatMessage> {
        check_session_id(session_id)?;
        let path = self.session_path(session_id);
        let lock = self.write_lock(session_id);
        let _guard = lock.lock();

        let mut messages = self.read_messages(&path)?.unwrap_or_default();
        let message = ChatMessage::new(role, content);
        messages.push(message.clone());

        let overflow = messages.len().saturating_sub(self.max_history);
        if overflow > 0 {
            messages.drain(..overflow);
            debug!("Evicted {} message(s) from session {}", overflow, session_id);
        }

        self.write_messages(&path, &messages)?;
        Ok(message)
    }

    fn history(&self, session_id: &str) -> crate::Result<Vec<ChatMessage>> {
        Ok(self
            .read_messages(&self.session_path(session_id))?
            .unwrap_or_default())
    }

    fn get_or_create(&self, session_id: &str) -> crate::Result<SessionMeta> {
        check_session_id(session_id)?;
        let path = self.session_path(session_id);
        let lock = self.write_lock(session_id);
        let _guard = lock.lock();

        let messages = match self.read_messages(&path)? {
            Some(messages) => messages,
            None => {
                debug!("Creating session file {}", path.display());
                self.write_messages(&path, &[])?;
                Vec::new()
            }
        };
        self.meta_for(&path, &messages)
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
        let entries = match std::fs::read_dir(&self.sessions_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::storage(&self.sessions_dir, e)),
        };

        let mut sessions = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| Error::storage(&self.sessions_dir, e))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let Some(id) = decode_session_id(stem) else {
                debug!("Skipping {}: not a session file name", path.display());
                continue;
            };
            // Removed between read_dir and read
            let Some(messages) = self.read_messages(&path)? else {
                continue;
            };

            let meta = self.meta_for(&path, &messages)?;
            sessions.push(SessionInfo {
                id,
                message_count: meta.message_count,
                created_at: meta.created_at,
                last_active_at: meta.last_active_at,
            });
        }

        sort_sessions(&mut sessions);
        Ok(sessions)
    }

    fn clear(&self, session_id: &str) -> crate::Result<()> {
        check_session_id(session_id)?;
        let path = self.session_path(session_id);
        let lock = self.write_lock(session_id);
        let _guard = lock.lock();
        self.write_messages(&path, &[])
    }

    fn delete(&self, session_id: &str) -> crate::Result<bool> {
        let path = self.session_path(session_id);
        let lock = self.write_lock(session_id);
        let _guard = lock.lock();

        let removed = match std::fs::remove_file(&path) {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => return Err(Error::storage(&path, e)),
        };

        {
            let mut locks = self.write_locks.lock();
            // Only the map and this call hold it, so nobody is waiting on it
            if Arc::strong_count(&lock) == 2 {
                locks.remove(session_id);
            }
        }

        let mut current = self.current.write();
        if current.as_deref() == Some(session_id) {
            *current = None;
        }
        Ok(removed)
    }

    fn summarize(&self, session_id: &str) -> crate::Result<String> {
        let path = self.session_path(session_id);
        let messages = self.read_messages(&path)?.unwrap_or_default();
        if messages.is_empty() {
            return Ok(super::EMPTY_SUMMARY.to_string());
        }
        let meta = self.meta_for(&path, &messages)?;
        Ok(summarize_history(&messages, meta.created_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::EMPTY_SUMMARY;
    use tempfile::TempDir;

    #[test]
    fn test_durable_store_creation() {
        let temp_dir = TempDir::new().unwrap();
        let store = DurableStore::new(temp_dir.path().join("sessions"), 10).unwrap();
        assert!(store.sessions_dir().exists());
        assert!(store.list_sessions().unwrap().is_empty());
    }

    #[test]
    fn test_zero_bound_fails_fast() {
        let temp_dir = TempDir::new().unwrap();
        let err = DurableStore::new(temp_dir.path(), 0).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_append_writes_json_array() {
        let temp_dir = TempDir::new().unwrap();
        let store = DurableStore::new(temp_dir.path(), 10).unwrap();
        store.append("session_1", Role::User, "Hello").unwrap();
        store.append("session_1", Role::Assistant, "Hi!").unwrap();

        let raw = std::fs::read_to_string(temp_dir.path().join("session_1.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let array = value.as_array().unwrap();
        assert_eq!(array.len(), 2);
        assert_eq!(array[0]["role"], "user");
        assert_eq!(array[1]["content"], "Hi!");
        assert!(!temp_dir.path().join("session_1.json.tmp").exists());
    }

    #[test]
    fn test_round_trip_through_fresh_store() {
        let temp_dir = TempDir::new().unwrap();
        let written = {
            let store = DurableStore::new(temp_dir.path(), 10).unwrap();
            vec![
                store.append("test:456", Role::User, "Test message").unwrap(),
                store.append("test:456", Role::Assistant, "Reply").unwrap(),
            ]
        };

        let reopened = DurableStore::new(temp_dir.path(), 10).unwrap();
        assert_eq!(reopened.history("test:456").unwrap(), written);
    }

    #[test]
    fn test_missing_file_is_empty_history() {
        let temp_dir = TempDir::new().unwrap();
        let store = DurableStore::new(temp_dir.path(), 10).unwrap();
        assert!(store.history("never-seen").unwrap().is_empty());
        assert_eq!(store.summarize("never-seen").unwrap(), EMPTY_SUMMARY);
        assert!(!store.session_path("never-seen").exists());
    }

    #[test]
    fn test_malformed_file_is_storage_error() {
        let temp_dir = TempDir::new().unwrap();
        let store = DurableStore::new(temp_dir.path(), 10).unwrap();
        std::fs::write(store.session_path("broken"), "[{\"role\": \"user\", ").unwrap();

        let err = store.history("broken").unwrap_err();
        assert!(err.is_storage());
        assert!(err.to_string().contains("malformed"));

        // Nothing is written over a file that could not be read
        assert!(store.append("broken", Role::User, "more").unwrap_err().is_storage());
        let raw = std::fs::read_to_string(store.session_path("broken")).unwrap();
        assert_eq!(raw, "[{\"role\": \"user\", ");
    }

    #[test]
    fn test_eviction_persists() {
        let temp_dir = TempDir::new().unwrap();
        let store = DurableStore::new(temp_dir.path(), 2).unwrap();
        for i in 0..3 {
            store.append("s", Role::User, &format!("m{}", i)).unwrap();
        }

        let reopened = DurableStore::new(temp_dir.path(), 2).unwrap();
        let contents: Vec<String> = reopened
            .history("s")
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, vec!["m1", "m2"]);
    }

    #[test]
    fn test_smaller_bound_trims_on_read() {
        let temp_dir = TempDir::new().unwrap();
        let store = DurableStore::new(temp_dir.path(), 10).unwrap();
        for i in 0..5 {
            store.append("s", Role::User, &format!("m{}", i)).unwrap();
        }

        let tighter = DurableStore::new(temp_dir.path(), 3).unwrap();
        let history = tighter.history("s").unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].content, "m2");
    }

    #[test]
    fn test_switch_creates_empty_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = DurableStore::new(temp_dir.path(), 5).unwrap();
        let meta = store.switch("fresh").unwrap();

        assert_eq!(meta.message_count, 0);
        assert_eq!(store.current().as_deref(), Some("fresh"));
        let raw = std::fs::read_to_string(store.session_path("fresh")).unwrap();
        assert_eq!(raw, "[]");
    }

    #[test]
    fn test_clear_and_delete() {
        let temp_dir = TempDir::new().unwrap();
        let store = DurableStore::new(temp_dir.path(), 5).unwrap();
        store.append("s", Role::User, "hello").unwrap();

        store.clear("s").unwrap();
        assert!(store.history("s").unwrap().is_empty());
        assert_eq!(store.list_sessions().unwrap()[0].id, "s");

        assert!(store.delete("s").unwrap());
        assert!(!store.delete("s").unwrap());
        assert!(store.list_sessions().unwrap().is_empty());
    }

    #[test]
    fn test_delete_releases_write_lock() {
        let temp_dir = TempDir::new().unwrap();
        let store = DurableStore::new(temp_dir.path(), 5).unwrap();
        for i in 0..3 {
            store.append(&format!("s{}", i), Role::User, "hello").unwrap();
        }
        assert_eq!(store.write_locks.lock().len(), 3);

        for i in 0..3 {
            assert!(store.delete(&format!("s{}", i)).unwrap());
        }
        assert!(store.write_locks.lock().is_empty());

        // Deleting something that never existed leaves nothing behind either
        assert!(!store.delete("ghost").unwrap());
        assert!(store.write_locks.lock().is_empty());
    }

    #[test]
    fn test_ids_map_to_distinct_files() {
        let temp_dir = TempDir::new().unwrap();
        let store = DurableStore::new(temp_dir.path(), 5).unwrap();
        store.append("user:1", Role::User, "colon").unwrap();
        store.append("user_1", Role::User, "underscore").unwrap();
        store.append("user/1", Role::User, "slash").unwrap();

        assert!(temp_dir.path().join("user%3A1.json").exists());
        assert!(temp_dir.path().join("user_1.json").exists());
        assert!(temp_dir.path().join("user%2F1.json").exists());
        assert_eq!(store.history("user:1").unwrap()[0].content, "colon");
        assert_eq!(store.history("user/1").unwrap()[0].content, "slash");

        let mut ids: Vec<String> = store
            .list_sessions()
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["user/1", "user:1", "user_1"]);
    }

    #[test]
    fn test_empty_id_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let store = DurableStore::new(temp_dir.path(), 5).unwrap();

        assert!(matches!(store.get_or_create("").unwrap_err(), Error::Validation(_)));
        assert!(matches!(
            store.append("", Role::User, "hi").unwrap_err(),
            Error::Validation(_)
        ));
        assert!(store.switch("").is_err());
        assert!(store.current().is_none());
        assert!(!temp_dir.path().join(".json").exists());
        assert!(store.history("").unwrap().is_empty());
    }

    #[test]
    fn test_list_ignores_other_files() {
        let temp_dir = TempDir::new().unwrap();
        let store = DurableStore::new(temp_dir.path(), 5).unwrap();
        store.append("a", Role::User, "x").unwrap();
        std::fs::write(temp_dir.path().join("notes.txt"), "ignore me").unwrap();
        std::fs::write(temp_dir.path().join("b.json.tmp"), "garbage").unwrap();
        std::fs::write(temp_dir.path().join("hand written.json"), "[]").unwrap();

        let sessions = store.list_sessions().unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id, "a");
        assert_eq!(sessions[0].message_count, 1);
    }

    #[test]
    fn test_concurrent_writers_do_not_lose_updates() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(DurableStore::new(temp_dir.path(), 100).unwrap());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..10 {
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

        assert_eq!(store.history("shared").unwrap().len(), 40);
    }
}
