use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::extract::{CodeBlock, extract_code_blocks};
use crate::models::{AskRequest, Slot, Source};
use crate::pipeline::Pipeline;
use crate::provider::AnswerProvider;
use crate::streaming::{StreamAccumulator, StreamState, StreamStatus};

const NONE_SELECTED: u8 = 0;

fn slot_code(slot: Slot) -> u8 {
    match slot {
        Slot::First => 1,
        Slot::Second => 2,
    }
}

fn slot_from_code(code: u8) -> Option<Slot> {
    match code {
        1 => Some(Slot::First),
        2 => Some(Slot::Second),
        _ => None,
    }
}

/// Where a comparison stands, derived from its two stream statuses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonPhase {
    /// No comparison is running
    Idle,
    /// Neither stream has finished
    Loading,
    /// Exactly one stream has finished
    Partial,
    /// Both streams have finished, successfully or not
    Complete,
}

impl ComparisonPhase {
    fn from_statuses(first: StreamStatus, second: StreamStatus) -> Self {
        match (first.is_terminal(), second.is_terminal()) {
            (false, false) => Self::Loading,
            (true, true) => Self::Complete,
            _ => Self::Partial,
        }
    }
}

/// Result of a selection attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    /// The selection now points at the requested slot
    Selected,
    /// The slot was already selected
    Unchanged,
    /// The slot has no content yet; nothing changed
    Rejected,
}

/// Finalized text of a completed slot, with its code regions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinalAnswer {
    pub source: Source,
    pub text: String,
    pub code_blocks: Vec<CodeBlock>,
}

/// The chosen answer, with the metadata a caller needs to persist or display it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectedAnswer {
    pub session: Uuid,
    pub prompt: String,
    pub slot: Slot,
    pub source: Source,
    pub status: StreamStatus,
    pub text: String,
}

/// One side of a comparison as recorded in a [`ComparisonResult`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotRecord {
    pub source: Source,
    pub status: StreamStatus,
    pub text: String,
    pub error: Option<String>,
}

/// The whole comparison: the prompt, both answers and the current choice.
///
/// This is what a caller persists or renders side by side once the user
/// settles on an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonResult {
    pub session: Uuid,
    pub prompt: String,
    pub first: SlotRecord,
    pub second: SlotRecord,
    pub selected: Option<Slot>,
}

struct SlotHandle {
    source: Source,
    state: watch::Receiver<StreamState>,
}

/// Two concurrently streamed answers to one prompt.
///
/// Each slot's state is written only by its own pipeline task; the session
/// holds read-only receivers. Dropping the session cancels both pipelines.
pub struct ComparisonSession {
    id: Uuid,
    prompt: String,
    first: SlotHandle,
    second: SlotHandle,
    selected: AtomicU8,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ComparisonSession {
    /// Create the session and spawn one pipeline per slot.
    ///
    /// Must be called from within a tokio runtime.
    pub(crate) fn launch(
        provider: Arc<dyn AnswerProvider>,
        prompt: &str,
        first: Source,
        second: Source,
    ) -> Arc<Self> {
        let id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        let mut tasks = Vec::with_capacity(2);

        let mut spawn = |slot: Slot, source: &Source| {
            let accumulator = StreamAccumulator::new();
            let state = accumulator.subscribe();
            let pipeline = Pipeline::new(
                Arc::clone(&provider),
                AskRequest::comparison(prompt, &source.id),
                accumulator,
                cancel.clone(),
                id,
                slot,
            );
            tasks.push(tokio::spawn(async move {
                pipeline.run().await;
            }));
            SlotHandle {
                source: source.clone(),
                state,
            }
        };

        let first = spawn(Slot::First, &first);
        let second = spawn(Slot::Second, &second);

        info!(
            session = %id,
            first = %first.source,
            second = %second.source,
            "Comparison started"
        );

        Arc::new(Self {
            id,
            prompt: prompt.to_string(),
            first,
            second,
            selected: AtomicU8::new(NONE_SELECTED),
            cancel,
            tasks: Mutex::new(tasks),
        })
    }

    fn handle(&self, slot: Slot) -> &SlotHandle {
        match slot {
            Slot::First => &self.first,
            Slot::Second => &self.second,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn source(&self, slot: Slot) -> &Source {
        &self.handle(slot).source
    }

    /// Current state of one slot; never blocks on the stream
    pub fn snapshot(&self, slot: Slot) -> StreamState {
        self.handle(slot).state.borrow().clone()
    }

    pub fn status(&self, slot: Slot) -> StreamStatus {
        self.handle(slot).state.borrow().status()
    }

    /// Receiver that is notified whenever the slot's state changes
    pub fn subscribe(&self, slot: Slot) -> watch::Receiver<StreamState> {
        self.handle(slot).state.clone()
    }

    pub fn phase(&self) -> ComparisonPhase {
        ComparisonPhase::from_statuses(self.status(Slot::First), self.status(Slot::Second))
    }

    /// Select a slot's answer. A slot with no text yet cannot be selected.
    /// Selecting the other slot replaces the previous choice.
    pub fn select(&self, slot: Slot) -> SelectOutcome {
        if !self.handle(slot).state.borrow().has_content() {
            debug!(session = %self.id, %slot, "Ignoring selection of a slot without content");
            return SelectOutcome::Rejected;
        }

        let previous = self.selected.swap(slot_code(slot), Ordering::SeqCst);
        if previous == slot_code(slot) {
            SelectOutcome::Unchanged
        } else {
            info!(session = %self.id, %slot, source = %self.source(slot), "Answer selected");
            SelectOutcome::Selected
        }
    }

    pub fn selected(&self) -> Option<Slot> {
        slot_from_code(self.selected.load(Ordering::SeqCst))
    }

    pub fn selected_answer(&self) -> Option<SelectedAnswer> {
        let slot = self.selected()?;
        let state = self.snapshot(slot);
        Some(SelectedAnswer {
            session: self.id,
            prompt: self.prompt.clone(),
            slot,
            source: self.source(slot).clone(),
            status: state.status(),
            text: state.text().to_string(),
        })
    }

    fn record(&self, slot: Slot) -> SlotRecord {
        let state = self.snapshot(slot);
        SlotRecord {
            source: self.source(slot).clone(),
            status: state.status(),
            text: state.text().to_string(),
            error: state.error_message().map(str::to_string),
        }
    }

    /// Snapshot of both slots and the selection
    pub fn result(&self) -> ComparisonResult {
        ComparisonResult {
            session: self.id,
            prompt: self.prompt.clone(),
            first: self.record(Slot::First),
            second: self.record(Slot::Second),
            selected: self.selected(),
        }
    }

    /// Text and code blocks of a slot, once it has completed successfully
    pub fn final_answer(&self, slot: Slot) -> Option<FinalAnswer> {
        let state = self.snapshot(slot);
        if state.status() != StreamStatus::Completed {
            return None;
        }
        Some(FinalAnswer {
            source: self.source(slot).clone(),
            code_blocks: extract_code_blocks(state.text()),
            text: state.text().to_string(),
        })
    }

    /// Wait until both slots are terminal or their pipelines have stopped
    pub async fn settled(&self) {
        let mut first = self.first.state.clone();
        let mut second = self.second.state.clone();
        tokio::join!(
            async move { first.wait_for(|s| s.is_terminal()).await.is_ok() },
            async move { second.wait_for(|s| s.is_terminal()).await.is_ok() },
        );
    }

    pub fn is_retired(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stop both pipelines and wait for their tasks to exit.
    ///
    /// After this returns neither slot's state can change again.
    pub(crate) async fn retire(&self) {
        self.cancel.cancel();
        let tasks = std::mem::take(&mut *self.tasks.lock().await);
        for task in tasks {
            if let Err(e) = task.await {
                warn!(session = %self.id, error = %e, "Pipeline task did not exit cleanly");
            }
        }
        debug!(session = %self.id, "Comparison retired");
    }
}

impl Drop for ComparisonSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
