mod buffering;
mod decoder;
mod sse_parser;

pub use buffering::LineBuffer;
pub use decoder::Utf8StreamDecoder;
pub use sse_parser::{decode_line, strip_framing, ChatLineParser, LineOutcome, LineParser};
