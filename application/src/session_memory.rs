use chrono::{DateTime, Utc};
use domain::session::{ConversationEntry, Session, SessionInfo};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct SessionLimits {
    pub max_sessions: usize,
    pub ttl: Duration,
    pub max_history: usize,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_sessions: 100,
            ttl: Duration::from_secs(3600),
            max_history: 20,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MemoryStats {
    pub total_sessions_created: u64,
    pub total_sessions_expired: u64,
    pub total_conversations: u64,
    pub active_sessions: usize,
    pub max_sessions: usize,
    pub ttl_seconds: u64,
}

/// Conversation logs keyed by session id. Owned by whoever serves requests
/// and passed explicitly to the chat service.
#[derive(Debug, Default)]
pub struct SessionMemory {
    sessions: HashMap<String, Session>,
    limits: SessionLimits,
    stats: MemoryStats,
}

impl SessionMemory {
    pub fn new(limits: SessionLimits) -> Self {
        Self {
            sessions: HashMap::new(),
            limits,
            stats: MemoryStats::default(),
        }
    }

    pub fn create_session(&mut self, session_id: Option<String>) -> String {
        self.create_session_at(session_id, Utc::now())
    }

    /// Returns the id unchanged when the session already exists. Expired
    /// sessions are evicted first, then the least recently used one if full.
    pub fn create_session_at(&mut self, session_id: Option<String>, now: DateTime<Utc>) -> String {
        let session_id = session_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        if self.sessions.contains_key(&session_id) {
            debug!(session_id = %session_id, "session already exists");
            return session_id;
        }

        self.evict_expired(now);
        if self.sessions.len() >= self.limits.max_sessions {
            self.evict_least_recent();
        }

        self.sessions.insert(
            session_id.clone(),
            Session::new(session_id.clone(), self.limits.max_history, now),
        );
        self.stats.total_sessions_created += 1;
        info!(session_id = %session_id, "created session");
        session_id
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    pub fn record(&mut self, session_id: &str, entry: ConversationEntry) {
        self.record_at(session_id, entry, Utc::now());
    }

    pub fn record_at(&mut self, session_id: &str, entry: ConversationEntry, now: DateTime<Utc>) {
        if !self.sessions.contains_key(session_id) {
            warn!(session_id, "recording into unknown session, creating it");
            self.create_session_at(Some(session_id.to_string()), now);
        }
        if let Some(session) = self.sessions.get_mut(session_id) {
            session.add(entry, now);
            self.stats.total_conversations += 1;
        }
    }

    pub fn conversation_context(&self, session_id: &str, count: usize) -> String {
        self.sessions
            .get(session_id)
            .map(|s| s.conversation_context(count))
            .unwrap_or_default()
    }

    pub fn recent(&self, session_id: &str, count: usize) -> Vec<ConversationEntry> {
        self.sessions
            .get(session_id)
            .map(|s| s.recent(count))
            .unwrap_or_default()
    }

    /// Clear history and stats, keeping the session and its preferences.
    pub fn reset(&mut self, session_id: &str) -> bool {
        match self.sessions.get_mut(session_id) {
            Some(session) => {
                session.clear(Utc::now());
                info!(session_id, "reset session");
                true
            }
            None => false,
        }
    }

    pub fn delete(&mut self, session_id: &str) -> bool {
        let removed = self.sessions.remove(session_id).is_some();
        if removed {
            info!(session_id, "deleted session");
        }
        removed
    }

    pub fn info(&self, session_id: &str) -> Option<SessionInfo> {
        self.sessions.get(session_id).map(Session::info)
    }

    /// Merge `preferences` into the session's stored preferences.
    pub fn update_preferences(&mut self, session_id: &str, preferences: Map<String, Value>) -> bool {
        match self.sessions.get_mut(session_id) {
            Some(session) => {
                session.preferences.extend(preferences);
                session.touch(Utc::now());
                true
            }
            None => false,
        }
    }

    pub fn preferences(&self, session_id: &str) -> Map<String, Value> {
        self.sessions
            .get(session_id)
            .map(|s| s.preferences.clone())
            .unwrap_or_default()
    }

    pub fn stats(&self) -> MemoryStats {
        MemoryStats {
            active_sessions: self.sessions.len(),
            max_sessions: self.limits.max_sessions,
            ttl_seconds: self.limits.ttl.as_secs(),
            ..self.stats.clone()
        }
    }

    fn evict_expired(&mut self, now: DateTime<Utc>) {
        let ttl = self.limits.ttl;
        let before = self.sessions.len();
        self.sessions.retain(|_, s| !s.is_expired(now, ttl));
        let expired = before - self.sessions.len();
        if expired > 0 {
            self.stats.total_sessions_expired += expired as u64;
            info!(expired, "cleaned up expired sessions");
        }
    }

    fn evict_least_recent(&mut self) {
        let oldest = self
            .sessions
            .values()
            .min_by_key(|s| s.last_accessed)
            .map(|s| s.id.clone());
        if let Some(id) = oldest {
            self.sessions.remove(&id);
            info!(session_id = %id, "removed least recently used session");
        }
    }
}
