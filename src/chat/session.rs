//! In-memory conversation sessions.
//!
//! A session holds a free-form context map and the message history that
//! the orchestrator replays for prompts carrying the same session id.
//! Nothing is persisted. The store holds at most `max_sessions` sessions;
//! creating one more evicts the least recently written session.

use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::llm::types::Message;

#[derive(Debug, Clone, Default)]
pub struct Session {
    pub context: HashMap<String, Value>,
    pub history: Vec<Message>,
    last_access: u64,
}

#[derive(Debug, Default)]
struct Sessions {
    map: HashMap<String, Session>,
    /// Logical clock, bumped on every write.
    clock: u64,
}

impl Sessions {
    /// Session for `id`, created (and an old one evicted if full) when absent.
    fn touch(&mut self, id: &str, max_sessions: usize) -> &mut Session {
        self.clock += 1;
        if !self.map.contains_key(id) && self.map.len() >= max_sessions {
            self.evict_oldest();
        }
        let session = self.map.entry(id.to_string()).or_default();
        session.last_access = self.clock;
        session
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .map
            .iter()
            .min_by_key(|(_, s)| s.last_access)
            .map(|(id, _)| id.clone());
        if let Some(id) = oldest {
            self.map.remove(&id);
            debug!(session = id, "Evicted least recently used session");
        }
    }
}

/// Sessions keyed by id.
#[derive(Debug)]
pub struct SessionStore {
    sessions: RwLock<Sessions>,
    history_limit: usize,
    max_sessions: usize,
}

impl SessionStore {
    /// `history_limit` caps the number of messages kept per session,
    /// `max_sessions` the number of sessions (at least one is kept).
    pub fn new(history_limit: usize, max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(Sessions::default()),
            history_limit,
            max_sessions: max_sessions.max(1),
        }
    }

    /// Snapshot of the session, creating it empty when absent.
    pub async fn get_session(&self, session_id: &str) -> Session {
        let mut sessions = self.sessions.write().await;
        sessions.touch(session_id, self.max_sessions).clone()
    }

    pub async fn update_context(&self, session_id: &str, key: &str, value: Value) {
        let mut sessions = self.sessions.write().await;
        sessions
            .touch(session_id, self.max_sessions)
            .context
            .insert(key.to_string(), value);
    }

    pub async fn get_context(&self, session_id: &str, key: &str) -> Option<Value> {
        let sessions = self.sessions.read().await;
        sessions.map.get(session_id)?.context.get(key).cloned()
    }

    pub async fn history(&self, session_id: &str) -> Vec<Message> {
        let sessions = self.sessions.read().await;
        sessions
            .map
            .get(session_id)
            .map(|s| s.history.clone())
            .unwrap_or_default()
    }

    /// Record a user prompt and the assistant's answer, dropping the oldest
    /// messages past the history limit.
    pub async fn append_turn(&self, session_id: &str, prompt: &str, answer: &str) {
        let mut sessions = self.sessions.write().await;
        let session = sessions.touch(session_id, self.max_sessions);
        session.history.push(Message::user(prompt));
        session.history.push(Message::assistant(answer));

        let excess = session.history.len().saturating_sub(self.history_limit);
        session.history.drain(..excess);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn count(store: &SessionStore) -> usize {
        store.sessions.read().await.map.len()
    }

    #[tokio::test]
    async fn test_get_session_creates_empty() {
        let store = SessionStore::new(10, 10);
        let session = store.get_session("s1").await;
        assert!(session.context.is_empty());
        assert!(session.history.is_empty());
        assert_eq!(count(&store).await, 1);
    }

    #[tokio::test]
    async fn test_context_roundtrip() {
        let store = SessionStore::new(10, 10);
        assert_eq!(store.get_context("s1", "k").await, None);
        store.update_context("s1", "k", json!({"v": 1})).await;
        assert_eq!(store.get_context("s1", "k").await, Some(json!({"v": 1})));
        assert_eq!(store.get_context("s2", "k").await, None);
    }

    #[tokio::test]
    async fn test_history_is_capped() {
        let store = SessionStore::new(4, 10);
        store.append_turn("s", "q1", "a1").await;
        store.append_turn("s", "q2", "a2").await;
        store.append_turn("s", "q3", "a3").await;

        let history = store.history("s").await;
        let contents: Vec<_> = history
            .iter()
            .filter_map(|m| m.content.as_deref())
            .collect();
        assert_eq!(contents, vec!["q2", "a2", "q3", "a3"]);
    }

    #[tokio::test]
    async fn test_session_count_is_bounded() {
        let store = SessionStore::new(2, 100);
        for i in 0..10_000 {
            store.append_turn(&format!("s{i}"), "q", "a").await;
        }
        assert_eq!(count(&store).await, 100);
        assert!(store.history("s0").await.is_empty());
        assert_eq!(store.history("s9999").await.len(), 2);
    }

    #[tokio::test]
    async fn test_least_recently_written_session_is_evicted() {
        let store = SessionStore::new(10, 2);
        store.append_turn("a", "q", "a").await;
        store.append_turn("b", "q", "a").await;
        store.update_context("a", "k", json!(1)).await;
        store.append_turn("c", "q", "a").await;

        assert_eq!(store.get_context("a", "k").await, Some(json!(1)));
        assert!(store.history("b").await.is_empty());
        assert_eq!(store.history("c").await.len(), 2);
        assert_eq!(count(&store).await, 2);
    }

    #[tokio::test]
    async fn test_reads_do_not_create_sessions() {
        let store = SessionStore::new(10, 10);
        assert!(store.history("ghost").await.is_empty());
        assert_eq!(store.get_context("ghost", "k").await, None);
        assert_eq!(count(&store).await, 0);
    }
}
