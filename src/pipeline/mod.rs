//! Streaming pipeline: capture → segmenter → engine pool.
//!
//! ```text
//! ┌───────────┐    ┌────────────┐    ┌───────────┐    ┌─────────────┐
//! │  Capture  │───▶│ Re-chunker │───▶│ Segmenter │───▶│ Engine Pool │───▶ events
//! │ (frames)  │    │ (windows)  │    │  (VAD)    │    │ (recognize) │
//! └───────────┘    └────────────┘    └───────────┘    └─────────────┘
//! ```

pub mod coordinator;

pub use coordinator::{PipelineEvent, SpeechPipeline};
