//! Analysis stream driver.

use futures::StreamExt;

use crate::application::ports::{ApiError, ChunkStream};
use crate::domain::debate::DebateEvent;
use crate::domain::stream::{Flow, StreamConsumer};
use crate::infrastructure::metrics;

/// Why the reader stopped pulling chunks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEnd {
    /// A `complete` or `error` event was dispatched.
    Terminal,
    /// The dispatcher asked to stop (session superseded).
    Stopped,
    /// The body ended without a terminal event.
    Exhausted,
    /// The connection failed mid-stream.
    Transport(ApiError),
}

/// Read `chunks` to the end, dispatching decoded events in arrival order.
///
/// The stream is dropped as soon as reading stops, releasing the
/// connection. A trailing segment without its `\n\n` terminator is
/// discarded.
pub async fn consume_stream<F>(mut chunks: ChunkStream, mut dispatch: F) -> StreamEnd
where
    F: FnMut(DebateEvent) -> Flow + Send,
{
    let mut consumer = StreamConsumer::new();

    let end = loop {
        match chunks.next().await {
            Some(Ok(chunk)) => match consumer.feed(&chunk, |event| {
                metrics::record_event(event.kind());
                dispatch(event)
            }) {
                Flow::Continue => {}
                Flow::Stop if consumer.is_terminal() => break StreamEnd::Terminal,
                Flow::Stop => break StreamEnd::Stopped,
            },
            Some(Err(err)) => break StreamEnd::Transport(err),
            None => break StreamEnd::Exhausted,
        }
    };
    drop(chunks);

    let stats = consumer.finish();
    metrics::record_stream_stats(&stats);
    tracing::debug!(
        dispatched = stats.dispatched,
        malformed = stats.malformed,
        ignored = stats.ignored,
        discarded_bytes = stats.discarded_bytes,
        end = ?end,
        "Analysis stream finished"
    );

    end
}
