use serde::{Deserialize, Serialize};

/// Coarse progress of one response, for status indicators next to the text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStage {
    /// Web search request is in flight
    Searching,
    /// Web search returned results
    Found,
    /// Server acknowledged the request and is retrieving context
    Retrieving,
    /// First text fragment arrived
    Generating,
    /// Stream reached a terminal state
    Finished,
}

/// The single boundary between stream processing and whatever paints text
///
/// `render` receives the full text to display (header included), never a
/// fragment. Renders of one response are monotonic: each argument extends the
/// previous one, except an error message that replaces a placeholder.
pub trait RenderSink {
    fn render(&mut self, text: &str);

    /// Remove the loading placeholder; called once, on the first fragment
    fn clear_placeholder(&mut self) {}

    fn progress(&mut self, _stage: ProgressStage) {}
}

impl<S: RenderSink + ?Sized> RenderSink for &mut S {
    fn render(&mut self, text: &str) {
        (**self).render(text)
    }

    fn clear_placeholder(&mut self) {
        (**self).clear_placeholder()
    }

    fn progress(&mut self, stage: ProgressStage) {
        (**self).progress(stage)
    }
}

impl<S: RenderSink + ?Sized> RenderSink for Box<S> {
    fn render(&mut self, text: &str) {
        (**self).render(text)
    }

    fn clear_placeholder(&mut self) {
        (**self).clear_placeholder()
    }

    fn progress(&mut self, stage: ProgressStage) {
        (**self).progress(stage)
    }
}

/// Adapter turning a closure into a `RenderSink`
pub struct FnSink<F>(F);

impl<F: FnMut(&str)> RenderSink for FnSink<F> {
    fn render(&mut self, text: &str) {
        (self.0)(text)
    }
}

/// Wrap a `FnMut(&str)` render callback
pub fn render_fn<F: FnMut(&str)>(f: F) -> FnSink<F> {
    FnSink(f)
}
