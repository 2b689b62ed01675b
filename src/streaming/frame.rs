use crate::streaming::event::{Event, parse_event};
use bytes::{Buf, BytesMut};
use std::cell::OnceCell;
use std::fmt;

/// Blank line separating two frames on the wire
pub const FRAME_DELIMITER: &[u8] = b"\n\n";

/// One delimiter-bounded unit of the response stream.
///
/// The event is parsed on first access and cached.
#[derive(Clone)]
pub struct Frame {
    payload: String,
    event: OnceCell<Event>,
}

impl Frame {
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            event: OnceCell::new(),
        }
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// The parsed meaning of this frame
    pub fn event(&self) -> &Event {
        self.event.get_or_init(|| parse_event(&self.payload))
    }

    pub fn into_event(self) -> Event {
        match self.event.into_inner() {
            Some(event) => event,
            None => parse_event(&self.payload),
        }
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("payload", &self.payload)
            .finish()
    }
}

impl PartialEq for Frame {
    fn eq(&self, other: &Self) -> bool {
        self.payload == other.payload
    }
}

impl Eq for Frame {}

/// Stateful decoder that cuts a chunked byte stream into frames.
///
/// Bytes are buffered until a delimiter arrives, so a frame split across any
/// number of reads is emitted exactly once, whole, in arrival order.
pub struct FrameDecoder {
    buffer: BytesMut,
    /// Offset up to which the buffer is known to hold no delimiter
    scanned: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(8192),
            scanned: 0,
        }
    }

    /// Buffer a chunk and lazily yield every frame it completes.
    ///
    /// Frames not pulled from the iterator stay buffered and are yielded by
    /// the next call.
    pub fn feed(&mut self, chunk: &[u8]) -> Frames<'_> {
        self.buffer.extend_from_slice(chunk);
        Frames { decoder: self }
    }

    /// Pop the next complete frame, if the buffer holds one
    pub fn next_frame(&mut self) -> Option<Frame> {
        let end = self.find_delimiter()?;
        let raw = self.buffer.split_to(end);
        self.buffer.advance(FRAME_DELIMITER.len());
        self.scanned = 0;

        let payload = match String::from_utf8(raw.to_vec()) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "Frame is not valid UTF-8, decoding lossily");
                String::from_utf8_lossy(&raw).into_owned()
            }
        };

        Some(Frame::new(payload))
    }

    fn find_delimiter(&mut self) -> Option<usize> {
        let start = self.scanned;
        match self.buffer[start..]
            .windows(FRAME_DELIMITER.len())
            .position(|w| w == FRAME_DELIMITER)
        {
            Some(pos) => Some(start + pos),
            None => {
                // The last byte may be the first half of a delimiter
                self.scanned = self
                    .buffer
                    .len()
                    .saturating_sub(FRAME_DELIMITER.len() - 1);
                None
            }
        }
    }

    /// Number of bytes waiting for a delimiter
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// End of stream. An unterminated residual is never a frame; returns its
    /// size if one was dropped.
    pub fn finish(mut self) -> Option<usize> {
        let residual = self.buffer.len();
        self.reset();
        (residual > 0).then_some(residual)
    }

    /// Drop any buffered bytes and start over at a frame boundary
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.scanned = 0;
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over the frames completed by one [`FrameDecoder::feed`] call
pub struct Frames<'a> {
    decoder: &'a mut FrameDecoder,
}

impl Iterator for Frames<'_> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        self.decoder.next_frame()
    }
}
