use crate::streaming::event::Event;
use serde::Serialize;
use tokio::sync::watch;

/// Lifecycle of one stream. Transitions only move forward:
/// `Pending -> Active -> {Completed, Failed}` (or straight from `Pending` to a terminal state).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamStatus {
    #[default]
    Pending,
    Active,
    Completed,
    Failed,
}

impl StreamStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Accumulated output and status of one streaming source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StreamState {
    text: String,
    status: StreamStatus,
    error: Option<String>,
}

impl StreamState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn status(&self) -> StreamStatus {
        self.status
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn has_content(&self) -> bool {
        !self.text.is_empty()
    }

    /// Apply one event; returns whether anything changed.
    ///
    /// Once terminal, the state is frozen: late or duplicated deliveries are ignored.
    pub fn apply(&mut self, event: &Event) -> bool {
        if self.is_terminal() {
            return false;
        }

        match event {
            Event::TextDelta { text } => {
                self.text.push_str(text);
                self.status = StreamStatus::Active;
                true
            }
            Event::Error { message, text } => {
                if let Some(text) = text {
                    self.text.push_str(text);
                }
                self.fail(message.clone())
            }
            Event::Done => self.complete(),
            Event::Unrecognized => false,
        }
    }

    /// Mark the stream failed. Text received so far is kept.
    pub fn fail(&mut self, message: impl Into<String>) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = StreamStatus::Failed;
        self.error = Some(message.into());
        true
    }

    pub fn complete(&mut self) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = StreamStatus::Completed;
        true
    }
}

/// Sole writer of one [`StreamState`].
///
/// Readers hold `watch::Receiver`s from [`subscribe`](Self::subscribe): they can
/// take snapshots at any time or await changes, but never mutate. Receivers see
/// the channel close once the accumulator is dropped.
#[derive(Debug)]
pub struct StreamAccumulator {
    tx: watch::Sender<StreamState>,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(StreamState::new());
        Self { tx }
    }

    pub fn apply(&self, event: &Event) -> bool {
        self.tx.send_if_modified(|state| state.apply(event))
    }

    pub fn fail(&self, message: impl Into<String>) -> bool {
        let message = message.into();
        self.tx.send_if_modified(|state| state.fail(message))
    }

    pub fn complete(&self) -> bool {
        self.tx.send_if_modified(|state| state.complete())
    }

    pub fn status(&self) -> StreamStatus {
        self.tx.borrow().status()
    }

    pub fn snapshot(&self) -> StreamState {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<StreamState> {
        self.tx.subscribe()
    }
}

impl Default for StreamAccumulator {
    fn default() -> Self {
        Self::new()
    }
}
