/// Line buffer for newline-delimited records
///
/// Decoded text is appended as it arrives; complete lines are handed out in
/// order and a trailing partial line stays buffered until the rest of it
/// shows up in a later chunk.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buffer: String,
}

impl LineBuffer {
    /// Create a new buffer with specified capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: String::with_capacity(capacity),
        }
    }

    /// Add decoded text to the buffer
    pub fn extend(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    /// Extract next line (up to \n) from buffer, without the line terminator
    /// Returns None if no complete line is available
    pub fn next_line(&mut self) -> Option<String> {
        let newline_pos = self.buffer.find('\n')?;

        let mut line: String = self.buffer.drain(..=newline_pos).collect();
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }

        Some(line)
    }

    /// Take the unterminated tail once no more input will arrive
    pub fn take_remainder(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }

        let mut rest = std::mem::take(&mut self.buffer);
        if rest.ends_with('\r') {
            rest.pop();
        }
        Some(rest)
    }

    /// Current buffer size in bytes
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
