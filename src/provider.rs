use bytes::Bytes;
use futures::Stream;
use std::future::Future;
use std::pin::Pin;

use crate::error::Result;
use crate::models::AskRequest;

/// Type alias for the raw response body of one answer stream
pub type AnswerStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Type alias for the future returned by stream_answer
pub type StreamFuture = Pin<Box<dyn Future<Output = Result<AnswerStream>> + Send>>;

/// Trait for backends that stream an answer for a prompt
pub trait AnswerProvider: Send + Sync {
    /// Issue the request and return the response body as a byte stream
    ///
    /// # Arguments
    /// * `request` - The prompt and source identifier to route it to
    ///
    /// # Returns
    /// A stream of raw body chunks, or an error if the request failed or the
    /// backend answered with a non-success status
    fn stream_answer(&self, request: AskRequest) -> StreamFuture;

    /// Get the provider name for logging
    fn name(&self) -> &str;
}
