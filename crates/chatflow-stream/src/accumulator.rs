/// Per-response text accumulator
///
/// Owns the growing response text for exactly one in-flight message. The
/// buffer only grows until the stream reaches a terminal state.
#[derive(Debug, Default)]
pub struct AccumulatorState {
    text: String,
    first_chunk_received: bool,
    is_processing: bool,
}

impl AccumulatorState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset for a new request and mark it in flight
    pub fn begin(&mut self) {
        self.text.clear();
        self.first_chunk_received = false;
        self.is_processing = true;
    }

    /// Append a fragment; returns true if it was the first one
    pub fn append(&mut self, fragment: &str) -> bool {
        self.text.push_str(fragment);

        let first = !self.first_chunk_received;
        self.first_chunk_received = true;
        first
    }

    /// Mark the request as no longer in flight
    pub fn finish(&mut self) {
        self.is_processing = false;
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn first_chunk_received(&self) -> bool {
        self.first_chunk_received
    }

    pub fn is_processing(&self) -> bool {
        self.is_processing
    }
}
