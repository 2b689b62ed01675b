use crate::metrics::COMPARE_METRICS;
use crate::models::StreamChunk;

/// Marker that introduces a structured event line
pub const DATA_PREFIX: &str = "data: ";

/// Terminal marker some producers send after the last chunk
pub const DONE_MARKER: &str = "[DONE]";

/// The decoded meaning of a frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// An incremental piece of the answer
    TextDelta { text: String },
    /// The producer reported a failure in-band, possibly alongside a last
    /// piece of text carried by the same frame
    Error {
        message: String,
        text: Option<String>,
    },
    /// The producer signalled the end of the answer
    Done,
    /// Anything else; carries nothing and is dropped
    Unrecognized,
}

impl Event {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Error { .. } | Self::Done)
    }

    pub fn as_text_delta(&self) -> Option<&str> {
        match self {
            Self::TextDelta { text } => Some(text),
            _ => None,
        }
    }
}

/// Interpret one frame payload.
///
/// Never fails: a payload that is not a well-formed event line is logged and
/// classified as [`Event::Unrecognized`] so the stream carries on.
pub fn parse_event(payload: &str) -> Event {
    let Some(body) = payload.strip_prefix(DATA_PREFIX) else {
        if !payload.trim().is_empty() {
            tracing::trace!(payload = %payload, "Skipping non-data frame");
        }
        return Event::Unrecognized;
    };

    if body.trim() == DONE_MARKER {
        return Event::Done;
    }

    let chunk: StreamChunk = match serde_json::from_str(body) {
        Ok(chunk) => chunk,
        Err(e) => {
            tracing::warn!(error = %e, body = %body, "Dropping malformed frame");
            COMPARE_METRICS.record_malformed_frame();
            return Event::Unrecognized;
        }
    };

    if let Some(message) = chunk.error_message() {
        return Event::Error {
            message: message.to_string(),
            text: chunk.text().map(str::to_string),
        };
    }

    match chunk.text() {
        Some(text) => Event::TextDelta {
            text: text.to_string(),
        },
        None => Event::Unrecognized,
    }
}
