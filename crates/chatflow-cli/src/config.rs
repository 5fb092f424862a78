use chatflow_client::{ChatRequest, RagChatRequest, SearchRequest};
use chatflow_stream::ConsumerOptions;
use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;

use crate::cli::Cli;

const ENV_PREFIX: &str = "CHATFLOW";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub stream: StreamConfig,
    /// Provider/model selection, sent as `model_config` (or `llm_config` for search)
    pub model: Option<Value>,
    /// Generation settings, sent as `settings`
    pub settings: Option<Value>,
    pub rag: RagConfig,
    pub logging: LoggingConfig,

    // Secret (from ENV only)
    #[serde(skip)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub throttle_ms: u64,
    pub header: Option<String>,
    pub error_prefix: String,
    pub empty_reply_message: Option<String>,
    pub flush_on_cancel: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            throttle_ms: 100,
            header: None,
            error_prefix: "Error: ".to_string(),
            empty_reply_message: None,
            flush_on_cancel: true,
        }
    }
}

/// Knowledge-base chat overrides; unset fields keep the request defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    pub knowledge_bases: Vec<String>,
    pub top_k: Option<u32>,
    pub threshold: Option<f32>,
    pub rerank: Option<bool>,
    pub context_window: Option<u32>,
    pub keyword_threshold: Option<u32>,
    pub temperature: Option<f32>,
    pub memory_window: Option<u32>,
    pub retriever_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml
    /// 2. config/{CHATFLOW_ENV}.toml (defaults to `dev`)
    /// 3. `explicit`, when given (must exist)
    /// 4. Environment variables: `CHATFLOW_STREAM__THROTTLE_MS=250`
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let env = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true);

        let mut cfg = Self::layered(explicit, env)?;

        // Load secret from ENV (not in TOML)
        cfg.api_key = std::env::var("CHATFLOW_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());

        Ok(cfg)
    }

    fn layered(explicit: Option<&Path>, env: Environment) -> Result<Self, ConfigError> {
        let profile = std::env::var("CHATFLOW_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut builder = ConfigLoader::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", profile)).required(false));

        if let Some(path) = explicit {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder.add_source(env).build()?.try_deserialize()
    }

    /// Command-line flags override everything else
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(base_url) = &cli.base_url {
            self.server.base_url = base_url.clone();
        }
        if let Some(throttle_ms) = cli.throttle_ms {
            self.stream.throttle_ms = throttle_ms;
        }
        if let Some(header) = &cli.header {
            self.stream.header = Some(header.clone());
        }
        if !cli.knowledge_bases.is_empty() {
            self.rag.knowledge_bases = cli.knowledge_bases.clone();
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.server.timeout_secs)
    }

    pub fn consumer_options(&self) -> ConsumerOptions {
        let mut options = ConsumerOptions::default()
            .with_throttle_interval(Duration::from_millis(self.stream.throttle_ms))
            .with_error_prefix(self.stream.error_prefix.clone())
            .with_flush_on_cancel(self.stream.flush_on_cancel);

        if let Some(header) = &self.stream.header {
            options = options.with_header(header.clone());
        }
        if let Some(message) = &self.stream.empty_reply_message {
            options = options.with_empty_reply_message(message.clone());
        }

        options
    }

    pub fn chat_request(&self, message: &str) -> ChatRequest {
        ChatRequest {
            message: message.to_string(),
            model_config: self.model.clone(),
            settings: self.settings.clone(),
        }
    }

    pub fn rag_request(&self, message: &str) -> RagChatRequest {
        let rag = &self.rag;
        let mut request = RagChatRequest::new(message, rag.knowledge_bases.clone());

        if let Some(top_k) = rag.top_k {
            request.top_k = top_k;
        }
        if let Some(threshold) = rag.threshold {
            request.threshold = threshold;
        }
        if let Some(rerank) = rag.rerank {
            request.rerank = rerank;
        }
        if let Some(context_window) = rag.context_window {
            request.context_window = context_window;
        }
        if let Some(keyword_threshold) = rag.keyword_threshold {
            request.keyword_threshold = keyword_threshold;
        }
        if let Some(temperature) = rag.temperature {
            request.temperature = temperature;
        }
        if let Some(memory_window) = rag.memory_window {
            request.memory_window = memory_window;
        }
        if let Some(retriever_type) = &rag.retriever_type {
            request.retriever_type = retriever_type.clone();
        }
        if let Some(model) = &self.model {
            request = request.with_selected_model(model.clone());
        }

        request
    }

    pub fn search_request(&self, message: &str) -> SearchRequest {
        SearchRequest {
            query: message.to_string(),
            llm_config: self.model.clone(),
            settings: self.settings.clone(),
        }
    }
}
