use chatflow_stream::{ProgressStage, RenderSink};
use std::io::{self, Stderr, Stdout, Write};

/// Renders into a terminal by appending only what is new since the last frame
///
/// Reply text goes to `out`, progress labels to `err`. A frame that does not
/// extend the previous one (an error replacing nothing, a changed header) is
/// reprinted in full on a fresh line.
pub struct TerminalSink<W: Write, E: Write> {
    out: W,
    err: E,
    printed: String,
}

impl TerminalSink<Stdout, Stderr> {
    pub fn stdio() -> Self {
        Self::new(io::stdout(), io::stderr())
    }
}

impl<W: Write, E: Write> TerminalSink<W, E> {
    pub fn new(out: W, err: E) -> Self {
        Self {
            out,
            err,
            printed: String::new(),
        }
    }

    /// Text currently on screen
    pub fn printed(&self) -> &str {
        &self.printed
    }

    pub fn into_inner(self) -> (W, E) {
        (self.out, self.err)
    }

    fn write_frame(&mut self, text: &str) -> io::Result<()> {
        match text.strip_prefix(self.printed.as_str()) {
            Some(suffix) => self.out.write_all(suffix.as_bytes())?,
            None => {
                if !self.printed.is_empty() {
                    self.out.write_all(b"\n")?;
                }
                self.out.write_all(text.as_bytes())?;
            }
        }
        self.out.flush()
    }

    fn write_stage(&mut self, stage: ProgressStage) -> io::Result<()> {
        let label = match stage {
            ProgressStage::Searching => "Searching the web...",
            ProgressStage::Found => "Found results, asking the model...",
            ProgressStage::Retrieving => "Retrieving context...",
            ProgressStage::Generating => return Ok(()),
            ProgressStage::Finished => {
                if !self.printed.is_empty() {
                    self.out.write_all(b"\n")?;
                    self.out.flush()?;
                }
                return Ok(());
            }
        };

        writeln!(self.err, "{}", label)?;
        self.err.flush()
    }
}

impl<W: Write, E: Write> RenderSink for TerminalSink<W, E> {
    fn render(&mut self, text: &str) {
        if let Err(e) = self.write_frame(text) {
            tracing::warn!("Failed to write reply to terminal: {}", e);
        }
        self.printed.clear();
        self.printed.push_str(text);
    }

    fn progress(&mut self, stage: ProgressStage) {
        if let Err(e) = self.write_stage(stage) {
            tracing::warn!("Failed to write progress to terminal: {}", e);
        }
    }
}
