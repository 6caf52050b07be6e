use crate::config::Config;
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use domain::{EmbedRole, Embedder, Responder, ResponderError, RetrievalError};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::types::Result;
use std::sync::Arc;

#[derive(Serialize)]
struct EmbeddingRequest {
    model: String,
    prompt: String,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: Message,
    done: bool,
}

/// Local model server, used as an offline alternative to Gemini.
#[derive(Clone)]
pub struct OllamaClient {
    client: Arc<Client>,
    base_url: String,
    model: String,
    embedding_model: String,
    role_prefixes: bool,
}

impl OllamaClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.respond_timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client: Arc::new(client),
            base_url: config.ollama_base_url.clone(),
            model: config.ollama_model.clone(),
            embedding_model: config.ollama_embedding_model.clone(),
            role_prefixes: config.ollama_role_prefixes,
        })
    }

    pub async fn generate_embedding(&self, text: &str, role: EmbedRole) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);
        let prompt = if self.role_prefixes {
            format!("{}{}", role.prefix(), text)
        } else {
            text.to_string()
        };
        let request = EmbeddingRequest {
            model: self.embedding_model.clone(),
            prompt,
        };
        let response = self.client.post(&url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Ollama embeddings error ({status}): {body}"));
        }
        let embedding_response: EmbeddingResponse = response.json().await?;
        Ok(embedding_response.embedding)
    }

    pub async fn generate_response(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            stream: false,
        };
        let response = self.client.post(&url).json(&request).send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(anyhow!("Ollama API error ({status}): {text}"));
        }
        // Some server versions stream NDJSON even with `stream: false`.
        let mut full_content = String::new();
        for line in text.lines() {
            if line.trim().is_empty() {
                continue;
            }
            if let Ok(chat_resp) = serde_json::from_str::<ChatResponse>(line) {
                full_content.push_str(&chat_resp.message.content);
                if chat_resp.done {
                    break;
                }
            }
        }
        let answer = full_content.trim();
        if answer.is_empty() {
            return Err(anyhow!("Ollama returned an empty answer"));
        }
        Ok(answer.to_string())
    }
}

#[async_trait]
impl Embedder for OllamaClient {
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
impl Responder for OllamaClient {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn respond(&self, prompt: &str) -> std::result::Result<String, ResponderError> {
        self.generate_response(prompt)
            .await
            .map_err(|e| ResponderError::Unavailable(format!("{e:#}")))
    }
}
