use anyhow::{anyhow, Context};
use dotenvy::dotenv;
use shared::types::Result;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Gemini,
    Ollama,
}

impl FromStr for Provider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(Provider::Gemini),
            "ollama" => Ok(Provider::Ollama),
            other => Err(anyhow!("unknown LLM_PROVIDER '{other}' (expected gemini or ollama)")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub provider: Provider,
    pub gemini_api_key: Option<String>,
    pub gemini_base_url: String,
    pub gemini_model: String,
    pub gemini_embedding_model: String,
    pub ollama_base_url: String,
    pub ollama_model: String,
    pub ollama_embedding_model: String,
    /// Prepend `query: ` / `passage: ` for e5-style local embedding models.
    pub ollama_role_prefixes: bool,
    pub faq_path: PathBuf,
    pub db_path: PathBuf,
    pub top_k: usize,
    /// Minimum cosine score kept for prompting. Unset means no cutoff.
    pub similarity_threshold: Option<f32>,
    pub embed_timeout: Duration,
    pub respond_timeout: Duration,
    pub max_attempts: u32,
    pub session_max: usize,
    pub session_ttl: Duration,
    pub history_turns: usize,
    pub intent_filter: bool,
    pub bind_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: Provider::Gemini,
            gemini_api_key: None,
            gemini_base_url: "https://generativelanguage.googleapis.com".to_string(),
            gemini_model: "gemini-2.0-flash".to_string(),
            gemini_embedding_model: "text-embedding-004".to_string(),
            ollama_base_url: "http://localhost:11434".to_string(),
            ollama_model: "qwen2.5:7b".to_string(),
            ollama_embedding_model: "nomic-embed-text".to_string(),
            ollama_role_prefixes: false,
            faq_path: PathBuf::from("data/dmrc_faq.json"),
            db_path: PathBuf::from("faq_index.db"),
            top_k: 3,
            similarity_threshold: None,
            embed_timeout: Duration::from_secs(5),
            respond_timeout: Duration::from_secs(30),
            max_attempts: 3,
            session_max: 100,
            session_ttl: Duration::from_secs(3600),
            history_turns: 3,
            intent_filter: true,
            bind_addr: "127.0.0.1:8000".to_string(),
        }
    }
}

impl Config {
    /// Read `.env` (if present) and the process environment.
    pub fn load() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset or blank keys keep their defaults;
    /// malformed values are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(provider) = get("LLM_PROVIDER") {
            config.provider = provider.parse()?;
        }
        config.gemini_api_key = get("GEMINI_API_KEY");
        if let Some(v) = get("GEMINI_BASE_URL") {
            config.gemini_base_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = get("GEMINI_MODEL") {
            config.gemini_model = v;
        }
        if let Some(v) = get("GEMINI_EMBEDDING_MODEL") {
            config.gemini_embedding_model = v;
        }
        if let Some(v) = get("OLLAMA_BASE_URL") {
            config.ollama_base_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = get("OLLAMA_MODEL") {
            config.ollama_model = v;
        }
        if let Some(v) = get("OLLAMA_EMBEDDING_MODEL") {
            config.ollama_embedding_model = v;
        }
        if let Some(v) = get("OLLAMA_ROLE_PREFIXES") {
            config.ollama_role_prefixes = parse_bool("OLLAMA_ROLE_PREFIXES", &v)?;
        }
        if let Some(v) = get("FAQ_PATH") {
            config.faq_path = PathBuf::from(v);
        }
        if let Some(v) = get("DB_PATH") {
            config.db_path = PathBuf::from(v);
        }
        if let Some(v) = get("TOP_K") {
            config.top_k = parse_num("TOP_K", &v)?;
            if config.top_k == 0 {
                return Err(anyhow!("TOP_K must be at least 1"));
            }
        }
        if let Some(v) = get("SIMILARITY_THRESHOLD") {
            let threshold: f32 = parse_num("SIMILARITY_THRESHOLD", &v)?;
            if !(-1.0..=1.0).contains(&threshold) {
                return Err(anyhow!("SIMILARITY_THRESHOLD must lie in [-1, 1], got {threshold}"));
            }
            config.similarity_threshold = Some(threshold);
        }
        if let Some(v) = get("EMBED_TIMEOUT_SECS") {
            config.embed_timeout = Duration::from_secs(parse_num("EMBED_TIMEOUT_SECS", &v)?);
        }
        if let Some(v) = get("RESPOND_TIMEOUT_SECS") {
            config.respond_timeout = Duration::from_secs(parse_num("RESPOND_TIMEOUT_SECS", &v)?);
        }
        if let Some(v) = get("MAX_ATTEMPTS") {
            config.max_attempts = parse_num::<u32>("MAX_ATTEMPTS", &v)?.max(1);
        }
        if let Some(v) = get("SESSION_MAX") {
            config.session_max = parse_num::<usize>("SESSION_MAX", &v)?.max(1);
        }
        if let Some(v) = get("SESSION_TTL_SECS") {
            config.session_ttl = Duration::from_secs(parse_num("SESSION_TTL_SECS", &v)?);
        }
        if let Some(v) = get("HISTORY_TURNS") {
            config.history_turns = parse_num("HISTORY_TURNS", &v)?;
        }
        if let Some(v) = get("INTENT_FILTER") {
            config.intent_filter = parse_bool("INTENT_FILTER", &v)?;
        }
        if let Some(v) = get("BIND_ADDR") {
            config.bind_addr = v;
        }
        Ok(config)
    }

    /// Embedding model identifier of the active provider.
    pub fn embedding_model(&self) -> &str {
        match self.provider {
            Provider::Gemini => &self.gemini_embedding_model,
            Provider::Ollama => &self.ollama_embedding_model,
        }
    }
}

fn parse_num<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse::<T>()
        .with_context(|| format!("{key} has invalid value '{value}'"))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(anyhow!("{key} has invalid boolean value '{value}'")),
    }
}
