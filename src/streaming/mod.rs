pub mod accumulator;
pub mod event;
pub mod frame;

pub use accumulator::{StreamAccumulator, StreamState, StreamStatus};
pub use event::{Event, parse_event};
pub use frame::{Frame, FrameDecoder};
