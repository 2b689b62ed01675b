//! # Model Compare
//!
//! Streams two model answers to the same prompt side by side and lets the
//! caller pick one.
//!
//! ## Overview
//!
//! Each side of a comparison is a pipeline:
//! - **Frame decoding** - raw body chunks are cut into blank-line delimited frames,
//!   however the network happened to split them
//! - **Event parsing** - `data: {"chunk": "..."}` frames become text deltas; malformed
//!   frames are logged and dropped without breaking the stream
//! - **Accumulation** - deltas are appended to a per-stream state that can be
//!   snapshotted at any moment
//!
//! The [`Coordinator`] runs two pipelines concurrently, keeps their failures
//! isolated from each other, and makes sure a superseded comparison can no
//! longer change once a new one has started.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use model_compare::{CompareConfig, Coordinator, Slot, client::HttpAnswerProvider};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CompareConfig::from_env()?;
//! let provider = Arc::new(HttpAnswerProvider::new(config.upstream.clone())?);
//! let coordinator = Coordinator::new(provider);
//!
//! let session = coordinator
//!     .start_comparison("What is a monad?", config.source("gpt-4o"), config.source("gemini-2.5-flash"))
//!     .await?;
//! session.settled().await;
//!
//! println!("{}", session.snapshot(Slot::First).text());
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`config`] - Configuration loading and validation
//! - [`error`] - Error types and handling
//! - [`streaming`] - Frame decoder, event parser and stream accumulator
//! - [`pipeline`] - One request -> decode -> accumulate chain
//! - [`session`] - A pair of streams, its phase and selection
//! - [`coordinator`] - Starts, supersedes and discards comparisons
//! - [`extract`] - Fenced code block extraction from finished answers

pub mod client;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod extract;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod provider;
pub mod session;
pub mod streaming;
pub mod validation;

pub use config::CompareConfig;
pub use coordinator::Coordinator;
pub use error::{CompareError, Result};
pub use extract::{CodeBlock, extract_code_blocks};
pub use models::{Slot, Source};
pub use session::{ComparisonPhase, ComparisonResult, ComparisonSession, SelectOutcome};
pub use streaming::{StreamState, StreamStatus};
