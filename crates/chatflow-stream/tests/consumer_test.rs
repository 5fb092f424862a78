use std::convert::Infallible;

use chatflow_stream::{
    CancellationToken, ConsumerOptions, ProgressStage, RenderSink, StreamError, StreamingResponseConsumer, Terminal,
};
use futures::{stream, Stream, StreamExt};
use tokio::time::{sleep, Duration};

#[derive(Default)]
struct Recorder {
    renders: Vec<String>,
    placeholder_cleared: usize,
    stages: Vec<ProgressStage>,
}

impl RenderSink for Recorder {
    fn render(&mut self, text: &str) {
        self.renders.push(text.to_string());
    }

    fn clear_placeholder(&mut self) {
        self.placeholder_cleared += 1;
    }

    fn progress(&mut self, stage: ProgressStage) {
        self.stages.push(stage);
    }
}

fn consumer() -> StreamingResponseConsumer<Recorder> {
    StreamingResponseConsumer::new(Recorder::default(), ConsumerOptions::default())
}

fn chunks(parts: Vec<Vec<u8>>) -> impl Stream<Item = Result<Vec<u8>, Infallible>> {
    stream::iter(parts.into_iter().map(Ok))
}

const MIXED_BODY: &str = "data: {\"type\":\"start\"}\n\n\
data: {\"type\":\"message\",\"content\":\"Réponse \"}\n\n\
data: {\"content\":\"在这里 \"}\n\n\
data: {\"status\":\"chunk\",\"content\":\"🎉 done\"}\n\n\
data: [DONE]\n\n";

#[tokio::test(start_paused = true)]
async fn test_fragmentation_invariance() {
    let bytes = MIXED_BODY.as_bytes();
    let expected = "Réponse 在这里 🎉 done";

    for split in 0..=bytes.len() {
        let parts = vec![bytes[..split].to_vec(), bytes[split..].to_vec()];
        let outcome = consumer().consume(chunks(parts), CancellationToken::new()).await.unwrap();

        assert_eq!(outcome.text, expected, "split at byte {split}");
        assert_eq!(outcome.terminal, Terminal::Sentinel);
    }

    let single_bytes: Vec<Vec<u8>> = bytes.iter().map(|b| vec![*b]).collect();
    let outcome = consumer().consume(chunks(single_bytes), CancellationToken::new()).await.unwrap();
    assert_eq!(outcome.text, expected);
    assert_eq!(outcome.malformed_lines, 0);
}

#[tokio::test(start_paused = true)]
async fn test_multibyte_split_at_chunk_boundary() {
    let line = "{\"content\":\"你好\"}\n";
    let bytes = line.as_bytes();
    // Cut one byte into the three-byte encoding of 你
    let cut = line.find('你').unwrap() + 1;

    let mut consumer = consumer();
    let outcome = consumer
        .consume(chunks(vec![bytes[..cut].to_vec(), bytes[cut..].to_vec()]), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.text, "你好");
    assert_eq!(outcome.terminal, Terminal::Exhausted);
    assert!(!consumer.sink().renders.iter().any(|r| r.contains('\u{FFFD}')));
}

#[tokio::test(start_paused = true)]
async fn test_body_cut_inside_character_is_replaced() {
    // Ends on the first byte of the two-byte encoding of é
    let parts = vec![b"{\"content\":\"a\"}\n".to_vec(), vec![0xC3]];

    let mut consumer = consumer();
    let outcome = consumer.consume(chunks(parts), CancellationToken::new()).await.unwrap();

    assert_eq!(outcome.text, "a");
    assert_eq!(outcome.terminal, Terminal::Exhausted);
    assert_eq!(outcome.malformed_lines, 1);
    assert_eq!(consumer.sink().renders.last().map(String::as_str), Some("a"));
}

#[tokio::test(start_paused = true)]
async fn test_malformed_line_is_skipped() {
    let clean = "data: {\"content\":\"one \"}\ndata: {\"content\":\"two\"}\ndata: [DONE]\n";
    let dirty = "data: {\"content\":\"one \"}\ndata: {not json\ndata: {\"content\":\"two\"}\ndata: [DONE]\n";

    let clean_outcome = consumer()
        .consume(chunks(vec![clean.as_bytes().to_vec()]), CancellationToken::new())
        .await
        .unwrap();
    let dirty_outcome = consumer()
        .consume(chunks(vec![dirty.as_bytes().to_vec()]), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(clean_outcome.text, dirty_outcome.text);
    assert_eq!(dirty_outcome.text, "one two");
    assert_eq!(dirty_outcome.malformed_lines, 1);
    assert_eq!(dirty_outcome.terminal, Terminal::Sentinel);
}

#[tokio::test(start_paused = true)]
async fn test_non_object_records_do_not_change_text() {
    let body = "data: {\"content\":\"Hi\"}\n\
data: [\"INJECTED\"]\n\
[\"also\", \"ignored\"]\n\
data: \"scalar\"\n\
data: 7\n\
data: {\"content\":\" there\"}\n\
data: [DONE]\n";

    let mut consumer = consumer();
    let outcome = consumer
        .consume(chunks(vec![body.as_bytes().to_vec()]), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.text, "Hi there");
    assert_eq!(outcome.terminal, Terminal::Sentinel);
    assert_eq!(outcome.malformed_lines, 0);
    assert!(consumer.sink().renders.iter().all(|r| !r.contains("INJECTED")));
}

#[tokio::test(start_paused = true)]
async fn test_burst_is_throttled_but_final_render_is_complete() {
    let body = async_stream::stream! {
        for i in 0..20 {
            yield Ok::<_, Infallible>(format!("{{\"content\":\"{i},\"}}\n").into_bytes());
            sleep(Duration::from_micros(2500)).await;
        }
    };

    let mut consumer = consumer();
    let outcome = consumer.consume(body, CancellationToken::new()).await.unwrap();

    let expected: String = (0..20).map(|i| format!("{i},")).collect();
    let renders = &consumer.sink().renders;

    assert_eq!(outcome.text, expected);
    assert!(renders.len() <= 5, "rendered {} times", renders.len());
    assert!(renders.len() < 20);
    assert_eq!(renders.last(), Some(&expected));
    assert_eq!(outcome.renders, renders.len());
}

#[tokio::test(start_paused = true)]
async fn test_deferred_render_fires_while_waiting_for_data() {
    let body = async_stream::stream! {
        yield Ok::<_, Infallible>(b"{\"content\":\"a\"}\n".to_vec());
        sleep(Duration::from_millis(10)).await;
        yield Ok(b"{\"content\":\"b\"}\n".to_vec());
        sleep(Duration::from_millis(200)).await;
        yield Ok(b"{\"content\":\"c\"}\n".to_vec());
    };

    let mut consumer = consumer();
    let outcome = consumer.consume(body, CancellationToken::new()).await.unwrap();

    assert_eq!(outcome.terminal, Terminal::Exhausted);
    assert_eq!(consumer.sink().renders, vec!["a", "ab", "abc", "abc"]);
}

#[tokio::test(start_paused = true)]
async fn test_renders_are_monotonic() {
    let body = async_stream::stream! {
        for word in ["The ", "quick ", "brown ", "fox"] {
            yield Ok::<_, Infallible>(format!("{{\"status\":\"chunk\",\"content\":\"{word}\"}}\n").into_bytes());
            sleep(Duration::from_millis(60)).await;
        }
        yield Ok(b"{\"status\":\"done\"}\n".to_vec());
    };

    let mut consumer = consumer();
    consumer.consume(body, CancellationToken::new()).await.unwrap();

    let renders = &consumer.sink().renders;
    for pair in renders.windows(2) {
        assert!(pair[1].starts_with(&pair[0]), "{:?} does not extend {:?}", pair[1], pair[0]);
    }
    assert_eq!(renders.last().map(String::as_str), Some("The quick brown fox"));
}

#[tokio::test(start_paused = true)]
async fn test_ndjson_chat_shape_reports_progress() {
    let body = "{\"status\":\"start\"}\n{\"status\":\"chunk\",\"content\":\"Hi\"}\n{\"status\":\"chunk\",\"content\":\" there\"}\n{\"status\":\"done\"}\n";

    let mut consumer = consumer();
    let outcome = consumer
        .consume(chunks(vec![body.as_bytes().to_vec()]), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.text, "Hi there");
    assert_eq!(outcome.terminal, Terminal::Done);

    let sink = consumer.sink();
    assert_eq!(sink.placeholder_cleared, 1);
    assert_eq!(
        sink.stages,
        vec![ProgressStage::Retrieving, ProgressStage::Generating, ProgressStage::Finished]
    );
}

#[tokio::test(start_paused = true)]
async fn test_error_after_content_keeps_partial_text() {
    let body = "data: {\"content\":\"partial\"}\ndata: {\"status\":\"error\",\"error\":\"boom\"}\n";

    let mut consumer = consumer();
    let outcome = consumer
        .consume(chunks(vec![body.as_bytes().to_vec()]), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.terminal, Terminal::Failed { message: "boom".to_string() });
    assert_eq!(outcome.text, "partial");
    assert_eq!(consumer.sink().renders.last().map(String::as_str), Some("partial"));
}

#[tokio::test(start_paused = true)]
async fn test_error_message_uses_configured_prefix() {
    let options = ConsumerOptions::default().with_error_prefix("RAG error: ");
    let mut consumer = StreamingResponseConsumer::new(Recorder::default(), options);

    consumer
        .consume(
            chunks(vec![b"data: {\"type\":\"error\",\"message\":\"kb offline\"}\n".to_vec()]),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(consumer.sink().renders, vec!["RAG error: kb offline"]);
    assert_eq!(consumer.sink().placeholder_cleared, 0);
}

#[tokio::test(start_paused = true)]
async fn test_trailing_line_without_newline_is_processed() {
    let outcome = consumer()
        .consume(
            chunks(vec![b"{\"content\":\"a\"}\n{\"content\":\"b\"}".to_vec()]),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.text, "ab");
    assert_eq!(outcome.terminal, Terminal::Exhausted);
}

#[tokio::test(start_paused = true)]
async fn test_transport_error_propagates() {
    let body = stream::iter(vec![
        Ok(b"{\"content\":\"a\"}\n".to_vec()),
        Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "connection reset")),
    ]);

    let mut consumer = consumer();
    let result = consumer.consume(body, CancellationToken::new()).await;

    match result {
        Err(StreamError::Transport(e)) => assert!(e.to_string().contains("connection reset")),
        other => panic!("expected transport error, got {other:?}"),
    }
    assert!(!consumer.state().is_processing());
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_stops_reading_and_rendering() {
    let body = chunks(vec![b"{\"content\":\"a\"}\n{\"content\":\"b\"}\n".to_vec()])
        .chain(stream::pending());

    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let mut consumer = consumer();
    let outcome = consumer.consume(body, token).await.unwrap();

    assert_eq!(outcome.terminal, Terminal::Cancelled);
    assert_eq!(outcome.text, "ab");
    // "b" was waiting on the throttle and is dropped
    assert_eq!(consumer.sink().renders, vec!["a"]);
    assert!(!consumer.state().is_processing());
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_before_first_read() {
    let body = chunks(vec![b"{\"content\":\"a\"}\n{\"content\":\"b\"}\n".to_vec()])
        .chain(stream::pending());

    let token = CancellationToken::new();
    token.cancel();

    let options = ConsumerOptions::default().with_flush_on_cancel(true);
    let mut consumer = StreamingResponseConsumer::new(Recorder::default(), options);

    // Already cancelled: nothing is read
    let outcome = consumer.consume(body, token).await.unwrap();
    assert_eq!(outcome.terminal, Terminal::Cancelled);
    assert_eq!(outcome.text, "");
    assert!(consumer.sink().renders.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_flushes_received_text() {
    let body = chunks(vec![b"{\"content\":\"a\"}\n{\"content\":\"b\"}\n".to_vec()])
        .chain(stream::pending());

    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let options = ConsumerOptions::default().with_flush_on_cancel(true);
    let mut consumer = StreamingResponseConsumer::new(Recorder::default(), options);
    let outcome = consumer.consume(body, token).await.unwrap();

    assert_eq!(outcome.terminal, Terminal::Cancelled);
    assert_eq!(consumer.sink().renders, vec!["a", "ab"]);
}

#[tokio::test(start_paused = true)]
async fn test_consumer_is_reusable_across_responses() {
    let mut consumer = consumer();

    let first = consumer
        .consume(chunks(vec![b"{\"content\":\"first\"}\n".to_vec()]), CancellationToken::new())
        .await
        .unwrap();
    let second = consumer
        .consume(chunks(vec![b"{\"content\":\"second\"}\n".to_vec()]), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(first.text, "first");
    assert_eq!(second.text, "second");
    assert_eq!(consumer.sink().placeholder_cleared, 2);
}

#[tokio::test(start_paused = true)]
async fn test_bytes_chunks_are_accepted() {
    let body = stream::iter(vec![
        Ok::<_, Infallible>(bytes::Bytes::from_static(b"data: {\"content\":\"ok\"}\n")),
        Ok(bytes::Bytes::from_static(b"data: [DONE]\n")),
    ]);

    let outcome = consumer().consume(body, CancellationToken::new()).await.unwrap();
    assert_eq!(outcome.text, "ok");
}
