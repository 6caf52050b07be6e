use crate::models::FaqRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::time::Duration;

/// One question/answer turn of a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub user_query: String,
    pub bot_response: String,
    pub timestamp: DateTime<Utc>,
    /// Which path produced the answer, e.g. `dmrc_rag` or `no_matches`.
    pub source: String,
    pub confidence: f32,
    #[serde(default)]
    pub context_used: Vec<FaqRecord>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl ConversationEntry {
    pub fn new(
        user_query: impl Into<String>,
        bot_response: impl Into<String>,
        source: impl Into<String>,
        confidence: f32,
    ) -> Self {
        Self {
            user_query: user_query.into(),
            bot_response: bot_response.into(),
            timestamp: Utc::now(),
            source: source.into(),
            confidence,
            context_used: Vec::new(),
            metadata: Map::new(),
        }
    }

    pub fn with_context(mut self, context: Vec<FaqRecord>) -> Self {
        self.context_used = context;
        self
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionStats {
    pub total_conversations: u64,
    pub avg_confidence: f32,
}

impl SessionStats {
    fn record(&mut self, confidence: f32) {
        self.total_conversations += 1;
        let n = self.total_conversations as f32;
        self.avg_confidence += (confidence - self.avg_confidence) / n;
    }
}

/// A bounded conversation log. The oldest turn is dropped once `max_history` is reached.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    pub preferences: Map<String, Value>,
    pub stats: SessionStats,
    history: VecDeque<ConversationEntry>,
    max_history: usize,
}

impl Session {
    pub fn new(id: impl Into<String>, max_history: usize, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            created_at: now,
            last_accessed: now,
            preferences: Map::new(),
            stats: SessionStats::default(),
            history: VecDeque::with_capacity(max_history),
            max_history: max_history.max(1),
        }
    }

    pub fn add(&mut self, entry: ConversationEntry, now: DateTime<Utc>) {
        self.stats.record(entry.confidence);
        if self.history.len() == self.max_history {
            self.history.pop_front();
        }
        self.history.push_back(entry);
        self.last_accessed = now;
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// The last `count` turns, oldest first.
    pub fn recent(&self, count: usize) -> Vec<ConversationEntry> {
        let skip = self.history.len().saturating_sub(count);
        self.history.iter().skip(skip).cloned().collect()
    }

    /// Recent turns rendered for inclusion in a prompt. Empty when there is no history.
    pub fn conversation_context(&self, count: usize) -> String {
        let recent = self.recent(count);
        if recent.is_empty() {
            return String::new();
        }
        let mut context = String::from("Recent conversation context:\n");
        for entry in &recent {
            context.push_str(&entry.user_query);
            context.push('\n');
            context.push_str(&entry.bot_response);
            context.push('\n');
        }
        context.push('\n');
        context
    }

    pub fn clear(&mut self, now: DateTime<Utc>) {
        self.history.clear();
        self.stats = SessionStats::default();
        self.last_accessed = now;
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_accessed = now;
    }

    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now.signed_duration_since(self.last_accessed)
            .to_std()
            .map(|idle| idle > ttl)
            .unwrap_or(false)
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            session_id: self.id.clone(),
            created_at: self.created_at,
            last_accessed: self.last_accessed,
            total_conversations: self.history.len(),
            stats: self.stats.clone(),
            preferences: self.preferences.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    pub total_conversations: usize,
    pub stats: SessionStats,
    pub preferences: Map<String, Value>,
}
