use crate::events::{RawRecord, StreamEvent};

/// What a single line of the response body turned out to be
#[derive(Debug)]
pub enum LineOutcome {
    /// Empty line, SSE comment, or an SSE field other than `data`
    Blank,
    /// `[DONE]` end-of-stream marker
    Sentinel,
    /// Record classified into an event
    Event(StreamEvent),
    /// Valid JSON that carries nothing actionable
    Ignored,
    /// Line that failed to parse; the stream carries on without it
    Malformed(serde_json::Error),
}

/// Strategy pattern for parsing different record vocabularies
pub trait LineParser: Send {
    /// Parse the payload of one line (framing already stripped)
    fn parse_record(&self, data: &str) -> Result<Option<StreamEvent>, serde_json::Error>;

    /// Check if this payload signals end of stream
    fn is_done_marker(&self, data: &str) -> bool {
        data == "[DONE]"
    }
}

/// Parser for the chat backend's duck-typed records
#[derive(Debug, Clone, Copy, Default)]
pub struct ChatLineParser;

impl LineParser for ChatLineParser {
    fn parse_record(&self, data: &str) -> Result<Option<StreamEvent>, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_str(data)?;

        // Records are objects; a derived struct would also accept an array by position
        if !value.is_object() {
            return Ok(None);
        }

        let record: RawRecord = serde_json::from_value(value)?;
        Ok(record.into_event())
    }
}

/// Strip SSE framing from a line, if present
///
/// Returns the payload for `data:` lines and bare lines, and None for the
/// other SSE fields (`event:`, `id:`, `retry:`) and comments.
pub fn strip_framing(line: &str) -> Option<&str> {
    if let Some(data) = line.strip_prefix("data:") {
        return Some(data.strip_prefix(' ').unwrap_or(data).trim());
    }

    if line.starts_with(':')
        || line.starts_with("event:")
        || line.starts_with("id:")
        || line.starts_with("retry:")
    {
        return None;
    }

    Some(line)
}

/// Decode one line of the response body
pub fn decode_line<P: LineParser + ?Sized>(line: &str, parser: &P) -> LineOutcome {
    let line = line.trim();
    if line.is_empty() {
        return LineOutcome::Blank;
    }

    let Some(data) = strip_framing(line) else {
        return LineOutcome::Blank;
    };

    if data.is_empty() {
        return LineOutcome::Blank;
    }

    if parser.is_done_marker(data) {
        return LineOutcome::Sentinel;
    }

    match parser.parse_record(data) {
        Ok(Some(event)) => LineOutcome::Event(event),
        Ok(None) => LineOutcome::Ignored,
        Err(e) => LineOutcome::Malformed(e),
    }
}
