use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Plain chat turn, answered as newline-delimited JSON records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// Provider/model selection, passed through untouched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_config: Option<Value>,
    /// Generation settings (temperature, system prompt, ...), passed through untouched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<Value>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            model_config: None,
            settings: None,
        }
    }

    pub fn with_model_config(mut self, model_config: Value) -> Self {
        self.model_config = Some(model_config);
        self
    }

    pub fn with_settings(mut self, settings: Value) -> Self {
        self.settings = Some(settings);
        self
    }
}

/// Knowledge-base chat turn, answered as SSE `data:` records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagChatRequest {
    pub message: String,
    pub knowledge_base_ids: Vec<String>,
    #[serde(default)]
    pub history: Vec<Value>,
    #[serde(default)]
    pub session_id: Option<String>,
    pub top_k: u32,
    pub threshold: f32,
    pub rerank: bool,
    pub context_window: u32,
    pub keyword_threshold: u32,
    pub enable_context_enrichment: bool,
    pub enable_ranking: bool,
    pub temperature: f32,
    pub memory_window: u32,
    #[serde(default)]
    pub selected_model: Option<Value>,
    pub retriever_type: String,
}

impl RagChatRequest {
    pub fn new(message: impl Into<String>, knowledge_base_ids: Vec<String>) -> Self {
        Self {
            message: message.into(),
            knowledge_base_ids,
            history: Vec::new(),
            session_id: None,
            top_k: 15,
            threshold: 0.7,
            rerank: false,
            context_window: 150,
            keyword_threshold: 1,
            enable_context_enrichment: true,
            enable_ranking: true,
            temperature: 0.3,
            memory_window: 5,
            selected_model: None,
            retriever_type: "hierarchical".to_string(),
        }
    }

    pub fn with_selected_model(mut self, model: Value) -> Self {
        self.selected_model = Some(model);
        self
    }

    /// Wire payload; older backends read `knowledge_bases`, newer ones `knowledge_base_ids`
    pub fn to_payload(&self) -> serde_json::Result<Value> {
        let mut payload = serde_json::to_value(self)?;

        if let Some(obj) = payload.as_object_mut() {
            obj.insert(
                "knowledge_bases".to_string(),
                serde_json::to_value(&self.knowledge_base_ids)?,
            );
        }

        Ok(payload)
    }
}

/// Web search that turns a question into a context-enriched prompt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_config: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<Value>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            llm_config: None,
            settings: None,
        }
    }

    pub fn with_llm_config(mut self, llm_config: Value) -> Self {
        self.llm_config = Some(llm_config);
        self
    }

    pub fn with_settings(mut self, settings: Value) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Chat request for the enriched prompt, carrying the same model and settings
    pub fn follow_up(&self, enhanced_prompt: impl Into<String>) -> ChatRequest {
        ChatRequest {
            message: enhanced_prompt.into(),
            model_config: self.llm_config.clone(),
            settings: self.settings.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub success: bool,
    #[serde(default)]
    pub enhanced_prompt: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}
