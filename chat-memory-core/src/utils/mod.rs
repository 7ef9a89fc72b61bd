//! Utility functions and helpers

use std::path::PathBuf;

/// Expand a leading `~/` to the user's home directory
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Encode a session id as a file stem. Every byte outside
/// `[A-Za-z0-9-._~]` is percent-encoded, `%` included, so distinct ids never
/// share a file and [`decode_session_id`] recovers the id exactly.
pub fn encode_session_id(id: &str) -> String {
    urlencoding::encode(id).into_owned()
}

/// Reverse [`encode_session_id`]. `None` for stems it could not have produced.
pub fn decode_session_id(stem: &str) -> Option<String> {
    let id = urlencoding::decode(stem).ok()?.into_owned();
    (encode_session_id(&id) == stem).then_some(id)
}

/// Truncate a string to at most `max_chars` characters, marking the cut with "..."
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
