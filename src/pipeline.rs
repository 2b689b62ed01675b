use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::metrics::COMPARE_METRICS;
use crate::models::{AskRequest, Slot};
use crate::provider::AnswerProvider;
use crate::streaming::{FrameDecoder, StreamAccumulator, StreamStatus};

/// How a pipeline stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineOutcome {
    Completed,
    Failed,
    /// Superseded before reaching a terminal state; its state was left untouched
    Cancelled,
}

/// One request -> decode -> parse -> accumulate chain for a single slot
pub struct Pipeline {
    provider: Arc<dyn AnswerProvider>,
    request: AskRequest,
    accumulator: StreamAccumulator,
    cancel: CancellationToken,
    session: Uuid,
    slot: Slot,
}

impl Pipeline {
    pub fn new(
        provider: Arc<dyn AnswerProvider>,
        request: AskRequest,
        accumulator: StreamAccumulator,
        cancel: CancellationToken,
        session: Uuid,
        slot: Slot,
    ) -> Self {
        Self {
            provider,
            request,
            accumulator,
            cancel,
            session,
            slot,
        }
    }

    pub async fn run(self) -> PipelineOutcome {
        let Pipeline {
            provider,
            request,
            accumulator,
            cancel,
            session,
            slot,
        } = self;
        let source = request.model.clone();

        info!(%session, %slot, %source, provider = provider.name(), "Starting pipeline");

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            opened = provider.stream_answer(request) => Some(opened),
        };

        let outcome = match opened {
            None => PipelineOutcome::Cancelled,
            Some(Ok(stream)) => drive(stream, &accumulator, &cancel).await,
            Some(Err(e)) if !cancel.is_cancelled() => {
                error!(%session, %slot, %source, error = %e, "Request failed");
                accumulator.fail(e.to_string());
                PipelineOutcome::Failed
            }
            Some(Err(_)) => PipelineOutcome::Cancelled,
        };

        let final_state = accumulator.snapshot();
        info!(
            %session,
            %slot,
            %source,
            ?outcome,
            chars = final_state.text().len(),
            "Pipeline finished"
        );
        COMPARE_METRICS.record_outcome(&source, outcome);

        outcome
    }
}

/// Feed a response body through the decoder into `accumulator` until the
/// body ends, fails, carries a terminal event, or `cancel` fires.
///
/// The cancellation token is checked before every `apply`, so nothing
/// reaches the accumulator once it has been cancelled.
pub async fn drive<S>(
    mut body: S,
    accumulator: &StreamAccumulator,
    cancel: &CancellationToken,
) -> PipelineOutcome
where
    S: Stream<Item = Result<Bytes>> + Unpin,
{
    let mut decoder = FrameDecoder::new();

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return PipelineOutcome::Cancelled,
            next = body.next() => next,
        };

        match next {
            Some(Ok(chunk)) => {
                for frame in decoder.feed(&chunk) {
                    if cancel.is_cancelled() {
                        return PipelineOutcome::Cancelled;
                    }
                    COMPARE_METRICS.record_frame();
                    accumulator.apply(frame.event());

                    match accumulator.status() {
                        StreamStatus::Completed => return PipelineOutcome::Completed,
                        StreamStatus::Failed => {
                            let state = accumulator.snapshot();
                            warn!(
                                error = state.error_message().unwrap_or_default(),
                                "Producer reported an error in-band"
                            );
                            return PipelineOutcome::Failed;
                        }
                        _ => {}
                    }
                }
            }
            Some(Err(e)) => {
                if cancel.is_cancelled() {
                    return PipelineOutcome::Cancelled;
                }
                error!(error = %e, "Response stream failed");
                accumulator.fail(e.to_string());
                return PipelineOutcome::Failed;
            }
            None => {
                if cancel.is_cancelled() {
                    return PipelineOutcome::Cancelled;
                }
                if let Some(residual) = decoder.finish() {
                    debug!(bytes = residual, "Discarding unterminated trailing frame");
                    COMPARE_METRICS.record_truncated_stream();
                }
                accumulator.complete();
                return PipelineOutcome::Completed;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompareError;
    use futures::stream;

    fn body(chunks: Vec<Result<&'static str>>) -> impl Stream<Item = Result<Bytes>> + Unpin {
        stream::iter(
            chunks
                .into_iter()
                .map(|c| c.map(|s| Bytes::from_static(s.as_bytes())))
                .collect::<Vec<_>>(),
        )
    }

    #[tokio::test]
    async fn test_drive_accumulates_and_completes() {
        let acc = StreamAccumulator::new();
        let cancel = CancellationToken::new();
        let body = body(vec![
            Ok("data: {\"chunk\":\"Hel\"}\n\n"),
            Ok("data: {\"chunk\":\"lo\"}\n\n"),
        ]);

        let outcome = drive(body, &acc, &cancel).await;

        assert_eq!(outcome, PipelineOutcome::Completed);
        assert_eq!(acc.snapshot().text(), "Hello");
        assert_eq!(acc.status(), StreamStatus::Completed);
    }

    #[tokio::test]
    async fn test_drive_keeps_partial_text_on_transport_error() {
        let acc = StreamAccumulator::new();
        let cancel = CancellationToken::new();
        let body = body(vec![
            Ok("data: {\"chunk\":\"partial\"}\n\n"),
            Err(CompareError::Transport("connection reset".to_string())),
            Ok("data: {\"chunk\":\"never\"}\n\n"),
        ]);

        let outcome = drive(body, &acc, &cancel).await;
        let state = acc.snapshot();

        assert_eq!(outcome, PipelineOutcome::Failed);
        assert_eq!(state.text(), "partial");
        assert!(state.error_message().unwrap().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_drive_stops_at_done_marker() {
        let acc = StreamAccumulator::new();
        let cancel = CancellationToken::new();
        let body = body(vec![Ok(
            "data: {\"chunk\":\"a\"}\n\ndata: [DONE]\n\ndata: {\"chunk\":\"b\"}\n\n",
        )]);

        assert_eq!(drive(body, &acc, &cancel).await, PipelineOutcome::Completed);
        assert_eq!(acc.snapshot().text(), "a");
    }

    #[tokio::test]
    async fn test_drive_fails_on_in_band_error() {
        let acc = StreamAccumulator::new();
        let cancel = CancellationToken::new();
        let body = body(vec![Ok(
            "data: {\"chunk\":\"a\"}\n\ndata: {\"error\":\"quota exceeded\"}\n\n",
        )]);

        assert_eq!(drive(body, &acc, &cancel).await, PipelineOutcome::Failed);
        let state = acc.snapshot();
        assert_eq!(state.text(), "a");
        assert_eq!(state.error_message(), Some("quota exceeded"));
    }

    #[tokio::test]
    async fn test_drive_ignores_falsy_error_field() {
        let acc = StreamAccumulator::new();
        let cancel = CancellationToken::new();
        let body = body(vec![Ok(
            "data: {\"chunk\":\"Hi\",\"error\":false}\n\ndata: {\"chunk\":\" there\",\"error\":\"\"}\n\n",
        )]);

        assert_eq!(drive(body, &acc, &cancel).await, PipelineOutcome::Completed);
        assert_eq!(acc.snapshot().text(), "Hi there");
    }

    #[tokio::test]
    async fn test_drive_keeps_text_of_failing_frame() {
        let acc = StreamAccumulator::new();
        let cancel = CancellationToken::new();
        let body = body(vec![Ok(
            "data: {\"chunk\":\"Hel\"}\n\ndata: {\"chunk\":\"lo\",\"error\":{\"message\":\"cut off\"}}\n\n",
        )]);

        assert_eq!(drive(body, &acc, &cancel).await, PipelineOutcome::Failed);
        let state = acc.snapshot();
        assert_eq!(state.text(), "Hello");
        assert_eq!(state.error_message(), Some("cut off"));
    }

    #[tokio::test]
    async fn test_drive_discards_truncated_tail() {
        let acc = StreamAccumulator::new();
        let cancel = CancellationToken::new();
        let body = body(vec![
            Ok("data: {\"chunk\":\"kept\"}\n\n"),
            Ok("data: {\"chunk\":\" lost\"}"),
        ]);

        assert_eq!(drive(body, &acc, &cancel).await, PipelineOutcome::Completed);
        assert_eq!(acc.snapshot().text(), "kept");
    }

    #[tokio::test]
    async fn test_cancelled_drive_never_applies() {
        let acc = StreamAccumulator::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let body = body(vec![Ok("data: {\"chunk\":\"stale\"}\n\n")]);

        assert_eq!(drive(body, &acc, &cancel).await, PipelineOutcome::Cancelled);
        assert_eq!(acc.snapshot(), crate::streaming::StreamState::new());
    }

    #[tokio::test]
    async fn test_empty_body_completes_without_text() {
        let acc = StreamAccumulator::new();
        let cancel = CancellationToken::new();

        assert_eq!(
            drive(body(vec![]), &acc, &cancel).await,
            PipelineOutcome::Completed
        );
        assert_eq!(acc.status(), StreamStatus::Completed);
        assert_eq!(acc.snapshot().text(), "");
    }
}
