use serde::{Deserialize, Serialize};

/// One decoded record from a chat response stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Server acknowledged the request (retrieval or generation is starting)
    Start,

    /// Text fragment to append to the response
    ContentDelta {
        text: String,
    },

    /// Text fragment sent in the `{"status":"chunk"}` shape
    StatusChunk {
        text: String,
    },

    /// Server finished the response
    Done,

    /// Server gave up on the response
    Error {
        message: String,
    },
}

const UNKNOWN_ERROR: &str = "unknown error";

/// Wire shape of a record, before classification
///
/// The backend mixes two vocabularies: the plain chat endpoint sends
/// `{"status": "start"|"chunk"|"done"|"error", "content"?, "error"?}` and the
/// knowledge-base endpoint sends `{"type": "start"|"message"|"done"|"error",
/// "content"?, "message"?}`. Every field is optional; unknown fields are
/// ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl RawRecord {
    fn tagged(&self, tag: &str) -> bool {
        self.status.as_deref() == Some(tag) || self.kind.as_deref() == Some(tag)
    }

    /// Classify the record into a `StreamEvent`
    ///
    /// Content wins over status, so a record carrying both text and a
    /// terminal status still contributes its text. Returns None for records
    /// with nothing actionable (empty content, unknown tags).
    pub fn into_event(self) -> Option<StreamEvent> {
        let has_content = self.content.as_deref().is_some_and(|c| !c.is_empty());

        if has_content {
            let is_chunk = self.status.as_deref() == Some("chunk");
            let text = self.content.unwrap_or_default();
            return Some(if is_chunk {
                StreamEvent::StatusChunk { text }
            } else {
                StreamEvent::ContentDelta { text }
            });
        }

        if self.tagged("done") {
            return Some(StreamEvent::Done);
        }

        if self.tagged("error") {
            let message = self
                .error
                .or(self.message)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| UNKNOWN_ERROR.to_string());
            return Some(StreamEvent::Error { message });
        }

        if self.tagged("start") {
            return Some(StreamEvent::Start);
        }

        None
    }
}
