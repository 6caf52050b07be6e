use crate::config::Config;
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use domain::{EmbedRole, Embedder, Responder, ResponderError, RetrievalError};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::types::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: String,
    content: Content<'a>,
    task_type: &'static str,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

fn task_type(role: EmbedRole) -> &'static str {
    match role {
        EmbedRole::Query => "RETRIEVAL_QUERY",
        EmbedRole::Passage => "RETRIEVAL_DOCUMENT",
    }
}

/// Client for the Gemini `generativelanguage` REST API.
#[derive(Clone)]
pub struct GeminiClient {
    client: Arc<Client>,
    base_url: String,
    api_key: Option<String>,
    model: String,
    embedding_model: String,
}

impl GeminiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.respond_timeout.max(Duration::from_secs(1)))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client: Arc::new(client),
            base_url: config.gemini_base_url.clone(),
            api_key: config.gemini_api_key.clone(),
            model: config.gemini_model.clone(),
            embedding_model: config.gemini_embedding_model.clone(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| anyhow!("GEMINI_API_KEY is not set"))
    }

    pub async fn generate_embedding(&self, text: &str, role: EmbedRole) -> Result<Vec<f32>> {
        let url = format!(
            "{}/v1beta/models/{}:embedContent",
            self.base_url, self.embedding_model
        );
        let request = EmbedContentRequest {
            model: format!("models/{}", self.embedding_model),
            content: Content {
                role: None,
                parts: vec![Part { text }],
            },
            task_type: task_type(role),
        };
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key()?)
            .json(&request)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Gemini embedding API error ({status}): {body}"));
        }
        let parsed: EmbedContentResponse = response.json().await?;
        Ok(parsed.embedding.values)
    }

    pub async fn generate_response(&self, prompt: &str) -> Result<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: prompt }],
            }],
        };
        debug!(model = %self.model, prompt_chars = prompt.len(), "calling generateContent");
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key()?)
            .json(&request)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Gemini API error ({status}): {body}"));
        }
        let parsed: GenerateContentResponse = response.json().await?;
        let candidate = parsed
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Gemini returned no candidates"))?;
        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        let text = text.trim();
        if text.is_empty() {
            return Err(anyhow!(
                "Gemini returned an empty answer (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            ));
        }
        Ok(text.to_string())
    }
}

#[async_trait]
impl Embedder for GeminiClient {
    fn model_id(&self) -> &str {
        &self.embedding_model
    }

    async fn embed(&self, text: &str, role: EmbedRole) -> std::result::Result<Vec<f32>, RetrievalError> {
        self.generate_embedding(text, role)
            .await
            .map_err(|e| RetrievalError::EmbedderUnavailable(format!("{e:#}")))
    }
}

#[async_trait]
impl Responder for GeminiClient {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn respond(&self, prompt: &str) -> std::result::Result<String, ResponderError> {
        if !self.is_configured() {
            return Err(ResponderError::NotConfigured);
        }
        self.generate_response(prompt)
            .await
            .map_err(|e| ResponderError::Unavailable(format!("{e:#}")))
    }
}
