//! Event segment codec.
//!
//! A segment is one blank-line-delimited block of the analysis stream:
//!
//! ```text
//! data: {"type":"agent_done","agent":"bull","text":"..."}
//! ```
//!
//! `data:` lines are stripped of their prefix and joined with `\n`. Comment
//! lines (`:`) and other field names are ignored.

use crate::domain::debate::DebateEvent;

/// Field prefix carrying the event payload.
const DATA_FIELD: &str = "data:";

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Payload was not a valid debate event.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),
}

/// JSON codec for analysis stream segments.
#[derive(Debug, Default, Clone, Copy)]
pub struct EventCodec;

impl EventCodec {
    /// Create a new codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Extract the joined `data:` payload of a segment.
    ///
    /// Returns `None` when the segment has no `data:` line.
    #[must_use]
    pub fn payload(segment: &str) -> Option<String> {
        let mut payload: Option<String> = None;
        for line in segment.split('\n') {
            let line = line.strip_suffix('\r').unwrap_or(line);
            let Some(value) = line.strip_prefix(DATA_FIELD) else {
                continue;
            };
            let value = value.strip_prefix(' ').unwrap_or(value);
            match payload.as_mut() {
                Some(joined) => {
                    joined.push('\n');
                    joined.push_str(value);
                }
                None => payload = Some(value.to_string()),
            }
        }
        payload
    }

    /// Decode a segment into a debate event.
    ///
    /// `Ok(None)` means the segment carried no payload (keep-alive comment,
    /// blank segment). Unrecognized `type` values decode to
    /// [`DebateEvent::Unknown`].
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not a JSON debate event.
    pub fn decode(&self, segment: &str) -> Result<Option<DebateEvent>, CodecError> {
        let Some(payload) = Self::payload(segment) else {
            return Ok(None);
        };
        let event = serde_json::from_str(&payload)?;
        Ok(Some(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::debate::AgentId;

    #[test]
    fn decodes_status_event() {
        let event = EventCodec::new()
            .decode(r#"data: {"type":"status","message":"Bull agent thinking..."}"#)
            .unwrap();
        assert_eq!(
            event,
            Some(DebateEvent::Status {
                message: "Bull agent thinking...".into()
            })
        );
    }

    #[test]
    fn accepts_prefix_without_space_and_crlf() {
        let event = EventCodec::new()
            .decode("data:{\"type\":\"agent_done\",\"agent\":\"quant\",\"text\":\"ok\"}\r")
            .unwrap();
        assert_eq!(
            event,
            Some(DebateEvent::AgentDone {
                agent: AgentId::Quant,
                text: "ok".into()
            })
        );
    }

    #[test]
    fn joins_multiple_data_lines() {
        let segment = "event: message\ndata: {\"type\":\"error\",\ndata: \"message\":\"boom\"}";
        assert_eq!(
            EventCodec::payload(segment).as_deref(),
            Some("{\"type\":\"error\",\n\"message\":\"boom\"}")
        );
        assert_eq!(
            EventCodec::new().decode(segment).unwrap(),
            Some(DebateEvent::Error {
                message: "boom".into()
            })
        );
    }

    #[test]
    fn comment_only_segment_has_no_payload() {
        assert_eq!(EventCodec::new().decode(": keep-alive").unwrap(), None);
        assert_eq!(EventCodec::new().decode("").unwrap(), None);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            EventCodec::new().decode("data: {not json"),
            Err(CodecError::Json(_))
        ));
    }
}
