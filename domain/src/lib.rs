pub mod capabilities;
pub mod errors;
pub mod models;
pub mod session;

pub use capabilities::{EmbedRole, Embedder, Responder};
pub use errors::{IndexError, ResponderError, RetrievalError};
pub use models::{FaqEntry, FaqIndex, FaqRecord, Query, RankedResult};
