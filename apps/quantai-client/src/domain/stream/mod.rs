//! Analysis Stream Decoding
//!
//! The analysis endpoint answers with a long-lived body of blank-line
//! delimited `data:` segments, each a JSON debate event. Decoding runs in
//! three stages, each owning its own buffer:
//!
//! - [`Utf8StreamDecoder`]: bytes to text, reassembling split code points
//! - [`EventFramer`]: text to `\n\n`-terminated segments
//! - [`EventCodec`]: segment to [`DebateEvent`](crate::domain::debate::DebateEvent)
//!
//! [`StreamConsumer`] chains them and stops at the first terminal event.

mod codec;
mod consumer;
mod decoder;
mod framer;

pub use codec::{CodecError, EventCodec};
pub use consumer::{Flow, StreamConsumer, StreamStats};
pub use decoder::Utf8StreamDecoder;
pub use framer::{EVENT_SEPARATOR, EventFramer};
