pub mod chat_service;
pub mod index_service;
pub mod intent_filter;
pub mod prompts;
pub mod retriever;
pub mod session_memory;

pub use chat_service::{AnswerSource, ChatError, ChatReply, ChatRequest, ChatService, ChatSettings};
pub use index_service::{IndexReport, IndexService};
pub use intent_filter::IntentFilter;
pub use retriever::Retriever;
pub use session_memory::{SessionLimits, SessionMemory};
