pub mod ask;
pub mod source;

pub use ask::{AskRequest, StreamChunk};
pub use source::{Slot, Source};
