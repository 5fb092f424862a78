pub mod client;
pub mod error;
pub mod types;

pub use client::{ByteStream, ChatBackend, ChatClient, ChatClientBuilder};
pub use error::{ClientError, Result};
pub use types::{ChatRequest, RagChatRequest, SearchRequest, SearchResponse};
