use anyhow::Context;
use chatflow_client::{ByteStream, ChatBackend, ClientError};
use chatflow_stream::{
    CancellationToken, ProgressStage, RenderSink, StreamOutcome, StreamingResponseConsumer, Terminal,
};

use crate::cli::Mode;
use crate::config::Config;

/// Send one message and stream the reply into `sink`
///
/// A request that fails before any body arrives is shown through the sink
/// with the configured error prefix and then returned as an error.
pub async fn run_turn<B, S>(
    backend: &B,
    mode: Mode,
    message: &str,
    config: &Config,
    sink: &mut S,
    cancel: CancellationToken,
) -> anyhow::Result<StreamOutcome>
where
    B: ChatBackend + ?Sized,
    S: RenderSink,
{
    let opened = tokio::select! {
        biased;

        _ = cancel.cancelled() => None,
        opened = open_stream(backend, mode, message, config, sink) => Some(opened),
    };

    let body = match opened {
        Some(Ok(body)) => body,
        Some(Err(e)) => {
            sink.render(&format!("{}{}", config.stream.error_prefix, e));
            return Err(anyhow::Error::new(e).context("Failed to start the reply stream"));
        }
        None => {
            tracing::debug!("Cancelled before the reply stream opened");
            return Ok(StreamOutcome {
                text: String::new(),
                terminal: Terminal::Cancelled,
                renders: 0,
                malformed_lines: 0,
            });
        }
    };

    let mut consumer = StreamingResponseConsumer::new(&mut *sink, config.consumer_options());
    let outcome = consumer
        .consume(body, cancel)
        .await
        .context("Reply stream broke off")?;

    Ok(outcome)
}

async fn open_stream<B, S>(
    backend: &B,
    mode: Mode,
    message: &str,
    config: &Config,
    sink: &mut S,
) -> chatflow_client::Result<ByteStream>
where
    B: ChatBackend + ?Sized,
    S: RenderSink,
{
    match mode {
        Mode::Chat => backend.stream_chat(&config.chat_request(message)).await,
        Mode::Rag => {
            if config.rag.knowledge_bases.is_empty() {
                return Err(ClientError::Config(
                    "knowledge-base chat needs at least one --kb".to_string(),
                ));
            }
            backend.stream_rag_chat(&config.rag_request(message)).await
        }
        Mode::Search => {
            sink.progress(ProgressStage::Searching);
            let body = backend.stream_network_chat(&config.search_request(message)).await?;
            sink.progress(ProgressStage::Found);

            Ok(body)
        }
    }
}
