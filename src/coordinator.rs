use arc_swap::ArcSwapOption;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::error::Result;
use crate::models::{Slot, Source};
use crate::provider::AnswerProvider;
use crate::session::{ComparisonPhase, ComparisonSession, SelectOutcome};
use crate::streaming::StreamState;
use crate::validation::{validate_prompt, validate_source};

/// Runs at most one comparison at a time and exposes its state.
///
/// Reads go through an `ArcSwapOption`, so rendering code can take snapshots
/// without contending with a comparison being started or discarded.
pub struct Coordinator {
    provider: Arc<dyn AnswerProvider>,
    current: ArcSwapOption<ComparisonSession>,
    /// Serializes session replacement
    transition: Mutex<()>,
}

impl Coordinator {
    pub fn new(provider: Arc<dyn AnswerProvider>) -> Self {
        Self {
            provider,
            current: ArcSwapOption::empty(),
            transition: Mutex::new(()),
        }
    }

    /// Start streaming `prompt` from both sources, replacing any running comparison.
    ///
    /// The previous session is retired before the new requests are issued:
    /// once this returns, nothing from the old session changes any more.
    pub async fn start_comparison(
        &self,
        prompt: &str,
        first: Source,
        second: Source,
    ) -> Result<Arc<ComparisonSession>> {
        validate_prompt(prompt)?;
        validate_source(&first)?;
        validate_source(&second)?;

        let _guard = self.transition.lock().await;

        if let Some(previous) = self.current.swap(None) {
            info!(session = %previous.id(), "Superseding running comparison");
            previous.retire().await;
        }

        let session = ComparisonSession::launch(Arc::clone(&self.provider), prompt, first, second);
        self.current.store(Some(Arc::clone(&session)));

        Ok(session)
    }

    /// Retire the current comparison, if any
    pub async fn discard(&self) {
        let _guard = self.transition.lock().await;
        if let Some(previous) = self.current.swap(None) {
            previous.retire().await;
        }
    }

    pub fn current(&self) -> Option<Arc<ComparisonSession>> {
        self.current.load_full()
    }

    pub fn snapshot(&self, slot: Slot) -> Option<StreamState> {
        self.current().map(|s| s.snapshot(slot))
    }

    pub fn phase(&self) -> ComparisonPhase {
        self.current()
            .map(|s| s.phase())
            .unwrap_or(ComparisonPhase::Idle)
    }

    /// Select a slot of the current comparison; rejected when there is none
    pub fn select_source(&self, slot: Slot) -> SelectOutcome {
        match self.current() {
            Some(session) => session.select(slot),
            None => SelectOutcome::Rejected,
        }
    }
}
