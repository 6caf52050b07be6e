pub mod config;
pub mod embedder;
pub mod faq_source;
pub mod faq_store;
pub mod gemini_client;
pub mod ollama_client;
pub mod retry;
pub mod search;
