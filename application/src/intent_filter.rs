use shared::utils::normalize_text;
use std::collections::HashSet;

const TRANSIT_VOCABULARY: &[&str] = &[
    "metro", "dmrc", "station", "train", "line", "platform", "card", "smart", "token", "fare",
    "ticket", "recharge", "topup", "parking", "airport", "express", "interchange", "route",
    "timing", "schedule", "frequency", "luggage", "baggage", "lost", "lift", "escalator",
    "feeder", "qr", "gate", "coach", "helpline", "complaint", "refund", "penalty", "fine",
    "commute", "commuter", "passenger", "delhi", "noida", "gurugram", "gurgaon", "faridabad",
    "ghaziabad", "yellow", "blue", "magenta", "pink", "violet", "red", "green", "aqua", "grey",
    "travel", "journey", "rail", "corridor", "exit", "entry", "cctv", "security",
];

/// Decides whether a query belongs on the FAQ retrieval path or the general
/// small-talk path. Keyword based; a disabled filter sends everything to retrieval.
#[derive(Debug, Clone)]
pub struct IntentFilter {
    enabled: bool,
    vocabulary: HashSet<String>,
}

impl Default for IntentFilter {
    fn default() -> Self {
        Self::new(true)
    }
}

impl IntentFilter {
    pub fn new(enabled: bool) -> Self {
        Self::with_vocabulary(enabled, TRANSIT_VOCABULARY.iter().copied())
    }

    pub fn with_vocabulary<'a>(enabled: bool, words: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            enabled,
            vocabulary: words.into_iter().map(normalize_text).collect(),
        }
    }

    pub fn is_dmrc_query(&self, query: &str) -> bool {
        if !self.enabled {
            return true;
        }
        let normalized = normalize_text(query);
        if normalized.is_empty() {
            return false;
        }
        normalized.split_whitespace().any(|word| self.matches(word))
    }

    fn matches(&self, word: &str) -> bool {
        if self.vocabulary.contains(word) {
            return true;
        }
        // plural forms: stations, fares, timings
        word.len() > 3
            && word
                .strip_suffix('s')
                .is_some_and(|stem| self.vocabulary.contains(stem))
    }
}
