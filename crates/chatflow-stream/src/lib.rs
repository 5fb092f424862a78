pub mod accumulator;
pub mod buffer_utils;
pub mod consumer;
pub mod error;
pub mod events;
pub mod sink;
pub mod throttle;

pub use accumulator::AccumulatorState;
pub use buffer_utils::{decode_line, ChatLineParser, LineBuffer, LineOutcome, LineParser, Utf8StreamDecoder};
pub use consumer::{ConsumerOptions, StreamOutcome, StreamingResponseConsumer, Terminal};
pub use error::{Result, StreamError};
pub use events::{RawRecord, StreamEvent};
pub use sink::{render_fn, FnSink, ProgressStage, RenderSink};
pub use throttle::{Throttle, DEFAULT_RENDER_INTERVAL};

pub use tokio_util::sync::CancellationToken;
