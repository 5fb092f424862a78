// HTTP client for the chat backend's streaming endpoints

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use std::pin::Pin;
use std::time::Duration;

use crate::error::{ClientError, Result};
use crate::types::{ChatRequest, RagChatRequest, SearchRequest, SearchResponse};

pub const CHAT_STREAM_PATH: &str = "/chat/api/chat/stream";
pub const RAG_STREAM_PATH: &str = "/rag/api/chat-stream";
pub const NETWORK_SEARCH_PATH: &str = "/network/search";

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Raw response body, chunk by chunk
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// The backend operations a chat front end needs
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Plain chat; NDJSON body
    async fn stream_chat(&self, request: &ChatRequest) -> Result<ByteStream>;

    /// Knowledge-base chat; SSE body
    async fn stream_rag_chat(&self, request: &RagChatRequest) -> Result<ByteStream>;

    /// Run a web search and return the enriched prompt
    async fn network_search(&self, request: &SearchRequest) -> Result<String>;

    /// Web search followed by a plain chat turn on the enriched prompt
    async fn stream_network_chat(&self, request: &SearchRequest) -> Result<ByteStream> {
        let enhanced_prompt = self.network_search(request).await?;
        tracing::info!("Web search produced a {}-byte prompt", enhanced_prompt.len());
        self.stream_chat(&request.follow_up(enhanced_prompt)).await
    }
}

/// Chat backend client (HTTP direct)
#[derive(Debug, Clone)]
pub struct ChatClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl ChatClient {
    /// Create new client with builder pattern
    pub fn builder() -> ChatClientBuilder {
        ChatClientBuilder::default()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post(&self, path: &str, payload: &Value) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("POST {}", url);

        let response = self.http_client.post(&url).json(payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("Unknown").to_string();
            let body = response.text().await.unwrap_or_default();
            tracing::error!("POST {} failed with {}: {}", url, status, body);
            return Err(ClientError::Status {
                status: status.as_u16(),
                reason,
                body,
            });
        }

        Ok(response)
    }

    async fn post_stream(&self, path: &str, payload: &Value) -> Result<ByteStream> {
        let response = self.post(path, payload).await?;
        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(ClientError::from))
            .boxed())
    }
}

#[async_trait]
impl ChatBackend for ChatClient {
    async fn stream_chat(&self, request: &ChatRequest) -> Result<ByteStream> {
        tracing::info!("Starting chat stream");
        let payload = serde_json::to_value(request)?;
        self.post_stream(CHAT_STREAM_PATH, &payload).await
    }

    async fn stream_rag_chat(&self, request: &RagChatRequest) -> Result<ByteStream> {
        tracing::info!(
            knowledge_bases = request.knowledge_base_ids.len(),
            "Starting knowledge-base chat stream"
        );
        let payload = request.to_payload()?;
        self.post_stream(RAG_STREAM_PATH, &payload).await
    }

    async fn network_search(&self, request: &SearchRequest) -> Result<String> {
        tracing::info!("Running web search");
        let payload = serde_json::to_value(request)?;
        let response: SearchResponse = self.post(NETWORK_SEARCH_PATH, &payload).await?.json().await?;

        if !response.success {
            return Err(ClientError::Search(
                response.error.unwrap_or_else(|| "search failed".to_string()),
            ));
        }

        response
            .enhanced_prompt
            .ok_or_else(|| ClientError::Search("response has no enhanced prompt".to_string()))
    }
}

/// Builder for ChatClient
#[derive(Default)]
pub struct ChatClientBuilder {
    base_url: Option<String>,
    api_key: Option<String>,
    connect_timeout: Option<Duration>,
}

impl ChatClientBuilder {
    /// Set the backend base URL
    /// Example: "http://localhost:8000"
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Bearer token sent with every request
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Connection timeout; streaming bodies themselves are not time-limited
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<ChatClient> {
        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::Config("Base URL is required".to_string()))?;

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ClientError::Config(format!(
                "Invalid base URL '{}': expected http:// or https://",
                base_url
            )));
        }

        // Remove trailing slash from base URL
        let base_url = base_url.trim_end_matches('/').to_string();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(api_key) = self.api_key.filter(|k| !k.trim().is_empty()) {
            let value = HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|_| ClientError::Config("Invalid API key format".to_string()))?;
            headers.insert(AUTHORIZATION, value);
        }

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT))
            .build()?;

        Ok(ChatClient {
            http_client,
            base_url,
        })
    }
}
