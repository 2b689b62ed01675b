use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::pipeline::PipelineOutcome;

/// Counters for stream decoding and pipeline outcomes
///
/// Thread-safe atomic counters shared by every pipeline in the process.
#[derive(Default)]
pub struct CompareMetrics {
    /// Frames cut from response bodies
    pub frames_decoded: AtomicU64,

    /// Data frames whose body was not well-formed JSON
    pub malformed_frames: AtomicU64,

    /// Streams that ended with an unterminated frame in the buffer
    pub truncated_streams: AtomicU64,

    pub pipelines_completed: AtomicU64,
    pub pipelines_failed: AtomicU64,
    pub pipelines_cancelled: AtomicU64,

    /// Failure count keyed by source id
    failures_by_source: DashMap<String, u64>,
}

impl CompareMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_frame(&self) {
        self.frames_decoded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_malformed_frame(&self) {
        self.malformed_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_truncated_stream(&self) {
        self.truncated_streams.fetch_add(1, Ordering::Relaxed);
    }

    /// Record how a pipeline for `source` ended
    pub fn record_outcome(&self, source: &str, outcome: PipelineOutcome) {
        match outcome {
            PipelineOutcome::Completed => {
                self.pipelines_completed.fetch_add(1, Ordering::Relaxed);
            }
            PipelineOutcome::Failed => {
                self.pipelines_failed.fetch_add(1, Ordering::Relaxed);
                *self
                    .failures_by_source
                    .entry(source.to_string())
                    .or_insert(0) += 1;
            }
            PipelineOutcome::Cancelled => {
                self.pipelines_cancelled.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn failures_for(&self, source: &str) -> u64 {
        self.failures_by_source
            .get(source)
            .map(|entry| *entry.value())
            .unwrap_or(0)
    }

    /// Get snapshot of current metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            frames_decoded: self.frames_decoded.load(Ordering::Relaxed),
            malformed_frames: self.malformed_frames.load(Ordering::Relaxed),
            truncated_streams: self.truncated_streams.load(Ordering::Relaxed),
            pipelines_completed: self.pipelines_completed.load(Ordering::Relaxed),
            pipelines_failed: self.pipelines_failed.load(Ordering::Relaxed),
            pipelines_cancelled: self.pipelines_cancelled.load(Ordering::Relaxed),
        }
    }

    /// Reset all metrics (useful for testing)
    pub fn reset(&self) {
        self.frames_decoded.store(0, Ordering::Relaxed);
        self.malformed_frames.store(0, Ordering::Relaxed);
        self.truncated_streams.store(0, Ordering::Relaxed);
        self.pipelines_completed.store(0, Ordering::Relaxed);
        self.pipelines_failed.store(0, Ordering::Relaxed);
        self.pipelines_cancelled.store(0, Ordering::Relaxed);
        self.failures_by_source.clear();
    }
}

/// Immutable snapshot of metrics at a point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub frames_decoded: u64,
    pub malformed_frames: u64,
    pub truncated_streams: u64,
    pub pipelines_completed: u64,
    pub pipelines_failed: u64,
    pub pipelines_cancelled: u64,
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Stream Metrics: {} frames ({} malformed, {} truncated streams), pipelines {} completed / {} failed / {} cancelled",
            self.frames_decoded,
            self.malformed_frames,
            self.truncated_streams,
            self.pipelines_completed,
            self.pipelines_failed,
            self.pipelines_cancelled
        )
    }
}

lazy_static::lazy_static! {
    /// Global metrics instance
    pub static ref COMPARE_METRICS: CompareMetrics = CompareMetrics::new();
}
