//! Pipeline coordinator.
//!
//! Glues capture, segmenter and engine pool into one push-driven flow:
//! arbitrary-length sample pushes are re-chunked into the segmenter's fixed
//! window size through a reusable fill buffer, detected segments are
//! dispatched to recognition, and results reach subscribers as events.
//!
//! The coordinator is single-writer: one logical thread drives
//! `accept_samples`. Only the engine pool behind it tolerates concurrent
//! callers.

use crate::engine::pool::EnginePool;
use crate::engine::{EngineFactory, RecognitionResult};
use crate::events::EventBus;
use crate::logging::{Logger, Severity, stderr_logger};
use crate::vad::scorer::SpeechScorer;
use crate::vad::segment::SpeechSegment;
use crate::vad::segmenter::{Segmenter, VadTransition};
use crossbeam_channel::Receiver;
use std::sync::Arc;

/// Notifications published to pipeline subscribers.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// An utterance opened.
    SpeechStart,
    /// An utterance closed.
    SpeechEnd,
    /// Recognition produced a non-empty result for a completed segment.
    SegmentResult(RecognitionResult),
}

/// Push-driven pipeline coordinator.
pub struct SpeechPipeline<S: SpeechScorer, F: EngineFactory> {
    segmenter: Segmenter<S>,
    pool: Arc<EnginePool<F>>,
    /// Reusable window accumulation buffer; no per-push allocation.
    window: Vec<f32>,
    fill: usize,
    events: Arc<EventBus<PipelineEvent>>,
    logger: Logger,
}

impl<S: SpeechScorer, F: EngineFactory> SpeechPipeline<S, F> {
    pub fn new(segmenter: Segmenter<S>, pool: Arc<EnginePool<F>>) -> Self {
        Self::with_logger(segmenter, pool, stderr_logger())
    }

    pub fn with_logger(segmenter: Segmenter<S>, pool: Arc<EnginePool<F>>, logger: Logger) -> Self {
        let window_size = segmenter.window_size();
        Self {
            segmenter,
            pool,
            window: vec![0.0; window_size],
            fill: 0,
            events: Arc::new(EventBus::new()),
            logger,
        }
    }

    /// True when both the segmenter and the recognition engine can accept
    /// work. Input arriving before readiness is dropped, not queued.
    pub fn is_ready(&self) -> bool {
        self.segmenter.is_ready() && self.pool.is_loaded()
    }

    /// Subscribes to pipeline events.
    pub fn subscribe(&self) -> Receiver<PipelineEvent> {
        self.events.subscribe()
    }

    /// Shared handle to the recognition pool.
    pub fn pool(&self) -> &Arc<EnginePool<F>> {
        &self.pool
    }

    /// Feeds arbitrary-length PCM samples.
    ///
    /// Completed segments are recognized synchronously on the caller's
    /// thread, in the order the segmenter emitted them; results are
    /// delivered in that same order.
    pub fn accept_samples(&mut self, samples: &[f32]) {
        for segment in self.ingest(samples) {
            self.recognize_segment(segment);
        }
    }

    /// Forces closure of any in-progress segment and recognizes it.
    /// Call when recording stops.
    pub fn flush(&mut self) {
        if let Some(VadTransition::SpeechEnd) = self.segmenter.flush() {
            self.events.publish(PipelineEvent::SpeechEnd);
        }
        for segment in self.segmenter.drain_segments() {
            self.recognize_segment(segment);
        }
    }

    /// Discards segmenter state and the partially-filled window.
    /// Used on stream reconfiguration.
    pub fn reset(&mut self) {
        self.segmenter.reset();
        self.fill = 0;
    }

    /// Re-chunks a push into exact windows and collects completed segments.
    fn ingest(&mut self, samples: &[f32]) -> Vec<SpeechSegment> {
        if samples.is_empty() {
            return Vec::new();
        }

        if !self.is_ready() {
            self.logger.emit(
                Severity::Error,
                "pipeline not ready: initialize the VAD scorer and engine pool first",
            );
            return Vec::new();
        }

        let window_size = self.window.len();
        let mut completed = Vec::new();

        for &sample in samples {
            self.window[self.fill] = sample;
            self.fill += 1;

            if self.fill < window_size {
                continue;
            }
            self.fill = 0;

            match self.segmenter.accept_window(&self.window) {
                Some(VadTransition::SpeechStart) => {
                    self.events.publish(PipelineEvent::SpeechStart);
                }
                Some(VadTransition::SpeechEnd) => {
                    self.events.publish(PipelineEvent::SpeechEnd);
                    completed.append(&mut self.segmenter.drain_segments());
                }
                None => {}
            }
        }

        completed
    }

    /// Recognizes one segment and publishes a result event on success.
    /// Empty or failed recognitions are swallowed; the pool logs them.
    fn recognize_segment(&self, segment: SpeechSegment) {
        if segment.is_empty() {
            return;
        }

        if let Some(result) = self.pool.recognize(&segment.samples, segment.sample_rate) {
            self.events.publish(PipelineEvent::SegmentResult(result));
        }
    }
}

impl<S: SpeechScorer, F: EngineFactory + 'static> SpeechPipeline<S, F> {
    /// Async variant of [`accept_samples`](Self::accept_samples).
    ///
    /// Each completed segment is recognized on a blocking worker task.
    /// Completion order is unspecified: results may reach subscribers in a
    /// different order than the segments were emitted. Callers needing
    /// strict ordering use the synchronous path.
    pub async fn accept_samples_async(&mut self, samples: &[f32]) {
        for segment in self.ingest(samples) {
            if segment.is_empty() {
                continue;
            }

            let pool = Arc::clone(&self.pool);
            let events = Arc::clone(&self.events);
            tokio::spawn(async move {
                if let Some(result) = pool
                    .recognize_async(segment.samples, segment.sample_rate)
                    .await
                {
                    events.publish(PipelineEvent::SegmentResult(result));
                }
            });
        }
    }
}
