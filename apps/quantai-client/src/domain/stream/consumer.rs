//! Chunk-to-event consumer for the analysis stream.

use super::codec::EventCodec;
use super::framer::EventFramer;
use crate::domain::debate::DebateEvent;

/// Whether the reader should keep pulling chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep reading.
    Continue,
    /// Release the stream.
    Stop,
}

/// Per-stream counters, reported when the stream ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Events handed to the dispatcher.
    pub dispatched: u64,
    /// Segments whose payload failed to parse.
    pub malformed: u64,
    /// Well-formed events of an unrecognized type.
    pub ignored: u64,
    /// Bytes of the unterminated remainder discarded at end of stream.
    pub discarded_bytes: usize,
}

/// Turns raw chunks into dispatched debate events.
///
/// Malformed segments are skipped and counted; unknown event types are
/// never dispatched. After the first terminal event every further byte is
/// ignored and `feed` keeps returning [`Flow::Stop`].
#[derive(Debug, Default)]
pub struct StreamConsumer {
    framer: EventFramer,
    codec: EventCodec,
    terminal: bool,
    stats: StreamStats,
}

impl StreamConsumer {
    /// Create a consumer for one stream.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            framer: EventFramer::new(),
            codec: EventCodec::new(),
            terminal: false,
            stats: StreamStats {
                dispatched: 0,
                malformed: 0,
                ignored: 0,
                discarded_bytes: 0,
            },
        }
    }

    /// Feed one chunk, dispatching every event it completes in order.
    ///
    /// Returns [`Flow::Stop`] once a terminal event has been dispatched or
    /// the dispatcher asks to stop.
    pub fn feed<F>(&mut self, chunk: &[u8], mut dispatch: F) -> Flow
    where
        F: FnMut(DebateEvent) -> Flow,
    {
        if self.terminal {
            return Flow::Stop;
        }

        for segment in self.framer.push(chunk) {
            let event = match self.codec.decode(&segment) {
                Ok(Some(event)) => event,
                Ok(None) => continue,
                Err(err) => {
                    self.stats.malformed += 1;
                    tracing::debug!(error = %err, segment_len = segment.len(), "Skipping malformed event");
                    continue;
                }
            };

            if matches!(event, DebateEvent::Unknown) {
                self.stats.ignored += 1;
                tracing::trace!("Ignoring event of unknown type");
                continue;
            }

            let terminal = event.is_terminal();
            self.stats.dispatched += 1;
            let flow = dispatch(event);

            if terminal {
                self.terminal = true;
                return Flow::Stop;
            }
            if flow == Flow::Stop {
                return Flow::Stop;
            }
        }

        Flow::Continue
    }

    /// Whether a terminal event has been dispatched.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.terminal
    }

    /// Counters so far.
    #[must_use]
    pub const fn stats(&self) -> StreamStats {
        self.stats
    }

    /// End of stream. Discards any unterminated remainder.
    #[must_use]
    pub fn finish(self) -> StreamStats {
        let mut stats = self.stats;
        if let Some(rest) = self.framer.finish() {
            stats.discarded_bytes = rest.len();
            tracing::debug!(bytes = rest.len(), "Discarding unterminated trailing segment");
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(consumer: &mut StreamConsumer, chunk: &[u8], out: &mut Vec<DebateEvent>) -> Flow {
        consumer.feed(chunk, |event| {
            out.push(event);
            Flow::Continue
        })
    }

    #[test]
    fn dispatches_events_in_order() {
        let mut consumer = StreamConsumer::new();
        let mut events = Vec::new();
        let flow = collect(
            &mut consumer,
            b"data: {\"type\":\"status\",\"message\":\"a\"}\n\ndata: {\"type\":\"status\",\"message\":\"b\"}\n\n",
            &mut events,
        );
        assert_eq!(flow, Flow::Continue);
        assert_eq!(events.len(), 2);
        assert_eq!(consumer.stats().dispatched, 2);
    }

    #[test]
    fn skips_malformed_and_unknown_segments() {
        let mut consumer = StreamConsumer::new();
        let mut events = Vec::new();
        let _ = collect(
            &mut consumer,
            b"data: {oops\n\ndata: {\"type\":\"heartbeat\"}\n\ndata: {\"type\":\"status\",\"message\":\"ok\"}\n\n",
            &mut events,
        );
        assert_eq!(events.len(), 1);
        let stats = consumer.stats();
        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.ignored, 1);
    }

    #[test]
    fn stops_after_terminal_event() {
        let mut consumer = StreamConsumer::new();
        let mut events = Vec::new();
        let flow = collect(
            &mut consumer,
            b"data: {\"type\":\"error\",\"message\":\"x\"}\n\ndata: {\"type\":\"status\",\"message\":\"late\"}\n\n",
            &mut events,
        );
        assert_eq!(flow, Flow::Stop);
        assert!(consumer.is_terminal());
        assert_eq!(events.len(), 1);

        let flow = collect(
            &mut consumer,
            b"data: {\"type\":\"status\",\"message\":\"later\"}\n\n",
            &mut events,
        );
        assert_eq!(flow, Flow::Stop);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn dispatcher_can_stop_the_stream() {
        let mut consumer = StreamConsumer::new();
        let flow = consumer.feed(
            b"data: {\"type\":\"status\",\"message\":\"a\"}\n\ndata: {\"type\":\"status\",\"message\":\"b\"}\n\n",
            |_| Flow::Stop,
        );
        assert_eq!(flow, Flow::Stop);
        assert_eq!(consumer.stats().dispatched, 1);
        assert!(!consumer.is_terminal());
    }

    #[test]
    fn finish_reports_discarded_remainder() {
        let mut consumer = StreamConsumer::new();
        let mut events = Vec::new();
        let chunk: &[u8] = b"data: {\"type\":\"complete\",\"data\":{}}";
        let _ = collect(&mut consumer, chunk, &mut events);
        assert!(events.is_empty());
        let stats = consumer.finish();
        assert_eq!(stats.discarded_bytes, chunk.len());
    }
}
