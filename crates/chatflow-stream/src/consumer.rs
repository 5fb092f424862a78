use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::time::{sleep_until, Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::accumulator::AccumulatorState;
use crate::buffer_utils::{decode_line, ChatLineParser, LineBuffer, LineOutcome, LineParser, Utf8StreamDecoder};
use crate::error::{Result, StreamError};
use crate::events::StreamEvent;
use crate::sink::{ProgressStage, RenderSink};
use crate::throttle::{Throttle, DEFAULT_RENDER_INTERVAL};

const LINE_BUFFER_CAPACITY: usize = 4096;

/// Knobs for one consumer
#[derive(Debug, Clone)]
pub struct ConsumerOptions {
    /// Minimum spacing between two intermediate renders
    pub throttle_interval: Duration,
    /// Static text prepended to every content render
    pub header: Option<String>,
    /// Prefix for the message shown when the server fails before any text
    pub error_prefix: String,
    /// Shown when the stream ends successfully without any text
    pub empty_reply_message: Option<String>,
    /// Render what was received when the stream is cancelled
    pub flush_on_cancel: bool,
}

impl Default for ConsumerOptions {
    fn default() -> Self {
        Self {
            throttle_interval: DEFAULT_RENDER_INTERVAL,
            header: None,
            error_prefix: "Error: ".to_string(),
            empty_reply_message: None,
            flush_on_cancel: false,
        }
    }
}

impl ConsumerOptions {
    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = Some(header.into());
        self
    }

    pub fn with_throttle_interval(mut self, interval: Duration) -> Self {
        self.throttle_interval = interval;
        self
    }

    pub fn with_error_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.error_prefix = prefix.into();
        self
    }

    pub fn with_empty_reply_message(mut self, message: impl Into<String>) -> Self {
        self.empty_reply_message = Some(message.into());
        self
    }

    pub fn with_flush_on_cancel(mut self, flush: bool) -> Self {
        self.flush_on_cancel = flush;
        self
    }
}

/// How a stream ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Terminal {
    /// Server sent a done record
    Done,
    /// Server sent the `[DONE]` marker
    Sentinel,
    /// Body ended without an explicit terminal record
    Exhausted,
    /// Server sent an error record
    Failed { message: String },
    /// Caller cancelled the stream
    Cancelled,
}

/// Result of consuming one response stream
#[derive(Debug, Clone)]
pub struct StreamOutcome {
    pub text: String,
    pub terminal: Terminal,
    pub renders: usize,
    pub malformed_lines: usize,
}

impl StreamOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.terminal, Terminal::Done | Terminal::Sentinel | Terminal::Exhausted)
    }
}

/// Turns a chunked response body into throttled renders of the accumulated text
///
/// One consumer serves one response at a time; `consume` takes `&mut self`,
/// so the accumulator and throttle can never be shared between two streams.
pub struct StreamingResponseConsumer<S, P = ChatLineParser> {
    sink: S,
    parser: P,
    options: ConsumerOptions,
    state: AccumulatorState,
    throttle: Throttle,
    renders: usize,
    malformed_lines: usize,
}

impl<S: RenderSink> StreamingResponseConsumer<S> {
    pub fn new(sink: S, options: ConsumerOptions) -> Self {
        Self::with_parser(sink, options, ChatLineParser)
    }
}

impl<S: RenderSink, P: LineParser> StreamingResponseConsumer<S, P> {
    pub fn with_parser(sink: S, options: ConsumerOptions, parser: P) -> Self {
        let throttle = Throttle::new(options.throttle_interval);
        Self {
            sink,
            parser,
            options,
            state: AccumulatorState::new(),
            throttle,
            renders: 0,
            malformed_lines: 0,
        }
    }

    pub fn state(&self) -> &AccumulatorState {
        &self.state
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Read `body` to its end, rendering through the sink as text arrives
    ///
    /// Stops at the first terminal condition: a done or error record, the
    /// `[DONE]` marker, the end of the body, or `cancel` firing. Read errors
    /// from `body` are returned as `StreamError::Transport`; a line that
    /// fails to parse is logged and skipped. Must run inside a Tokio runtime
    /// (deferred renders use Tokio timers).
    pub async fn consume<St, B, E>(&mut self, body: St, cancel: CancellationToken) -> Result<StreamOutcome>
    where
        St: Stream<Item = std::result::Result<B, E>>,
        B: AsRef<[u8]>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        self.reset();
        tracing::debug!("Stream consumer started");

        let result = self.run(body, &cancel).await;

        self.throttle.flush();
        self.state.finish();

        let terminal = match result {
            Ok(terminal) => terminal,
            Err(e) => {
                tracing::error!("Response stream failed after {} bytes: {}", self.state.text().len(), e);
                return Err(e);
            }
        };

        self.sink.progress(ProgressStage::Finished);
        tracing::debug!(
            renders = self.renders,
            malformed_lines = self.malformed_lines,
            "Stream consumer finished: {:?}",
            terminal
        );

        Ok(StreamOutcome {
            text: self.state.text().to_string(),
            terminal,
            renders: self.renders,
            malformed_lines: self.malformed_lines,
        })
    }

    fn reset(&mut self) {
        self.state.begin();
        self.throttle = Throttle::new(self.options.throttle_interval);
        self.renders = 0;
        self.malformed_lines = 0;
    }

    async fn run<St, B, E>(&mut self, body: St, cancel: &CancellationToken) -> Result<Terminal>
    where
        St: Stream<Item = std::result::Result<B, E>>,
        B: AsRef<[u8]>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let mut body = std::pin::pin!(body);
        let mut decoder = Utf8StreamDecoder::new();
        let mut lines = LineBuffer::with_capacity(LINE_BUFFER_CAPACITY);

        loop {
            let deadline = self.throttle.deadline();

            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    return Ok(self.cancel());
                }

                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if self.throttle.is_due(Instant::now()) {
                        self.render_now();
                    }
                }

                next = body.next() => match next {
                    Some(Ok(chunk)) => {
                        lines.extend(&decoder.decode(chunk.as_ref()));

                        while let Some(line) = lines.next_line() {
                            if let Some(terminal) = self.process_line(&line) {
                                return Ok(terminal);
                            }
                        }
                    }
                    Some(Err(e)) => return Err(StreamError::transport(e)),
                    None => {
                        if decoder.pending_len() > 0 {
                            tracing::warn!(
                                "Body ended inside a multi-byte character; {} byte(s) replaced",
                                decoder.pending_len()
                            );
                        }
                        lines.extend(&decoder.finish());

                        while let Some(line) = lines.next_line() {
                            if let Some(terminal) = self.process_line(&line) {
                                return Ok(terminal);
                            }
                        }
                        if let Some(rest) = lines.take_remainder() {
                            if let Some(terminal) = self.process_line(&rest) {
                                return Ok(terminal);
                            }
                        }

                        return Ok(self.complete(Terminal::Exhausted));
                    }
                },
            }
        }
    }

    fn process_line(&mut self, line: &str) -> Option<Terminal> {
        match decode_line(line, &self.parser) {
            LineOutcome::Blank | LineOutcome::Ignored => None,
            LineOutcome::Sentinel => Some(self.complete(Terminal::Sentinel)),
            LineOutcome::Malformed(e) => {
                self.malformed_lines += 1;
                tracing::warn!(error = %e, "Skipping malformed stream record: {}", line);
                None
            }
            LineOutcome::Event(event) => self.apply(event),
        }
    }

    fn apply(&mut self, event: StreamEvent) -> Option<Terminal> {
        match event {
            StreamEvent::Start => {
                self.sink.progress(ProgressStage::Retrieving);
                None
            }
            StreamEvent::ContentDelta { text } | StreamEvent::StatusChunk { text } => {
                self.append(&text);
                None
            }
            StreamEvent::Done => Some(self.complete(Terminal::Done)),
            StreamEvent::Error { message } => Some(self.fail(message)),
        }
    }

    fn append(&mut self, fragment: &str) {
        if self.state.append(fragment) {
            self.sink.clear_placeholder();
            self.sink.progress(ProgressStage::Generating);
        }

        if self.throttle.observe(Instant::now()) {
            self.render_now();
        }
    }

    fn render_now(&mut self) {
        let frame = match &self.options.header {
            Some(header) => format!("{}{}", header, self.state.text()),
            None => self.state.text().to_string(),
        };

        self.sink.render(&frame);
        self.renders += 1;
        self.throttle.mark_rendered(Instant::now());
    }

    /// Successful end: one unconditional render of everything received
    fn complete(&mut self, terminal: Terminal) -> Terminal {
        self.throttle.flush();

        if self.state.first_chunk_received() {
            self.render_now();
        } else if let Some(message) = &self.options.empty_reply_message {
            self.sink.render(message);
            self.renders += 1;
        }

        terminal
    }

    fn fail(&mut self, message: String) -> Terminal {
        self.throttle.flush();
        tracing::warn!("Server reported an error: {}", message);

        if self.state.first_chunk_received() {
            // Keep the partial answer on screen
            self.render_now();
        } else {
            let text = format!("{}{}", self.options.error_prefix, message);
            self.sink.render(&text);
            self.renders += 1;
        }

        Terminal::Failed { message }
    }

    fn cancel(&mut self) -> Terminal {
        self.throttle.flush();
        tracing::debug!("Stream cancelled by caller");

        if self.options.flush_on_cancel && self.state.first_chunk_received() {
            self.render_now();
        }

        Terminal::Cancelled
    }
}
