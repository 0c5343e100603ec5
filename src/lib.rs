//! voicekit - Offline voice pipeline toolkit
//!
//! Continuous capture into a circular buffer, fixed-window VAD
//! segmentation, segment-triggered recognition through a pooled engine, and
//! LRU-cached synthesis. Native inference engines stay behind narrow
//! capability traits supplied by the embedding application.

// Enforce error handling discipline
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
pub mod cancel;
pub mod config;
pub mod defaults;
pub mod engine;
pub mod error;
pub mod events;
pub mod kws;
pub mod logging;
pub mod pipeline;
pub mod streaming;
pub mod tts;
pub mod vad;

// Core traits (source → segment → recognize/synthesize)
pub use audio::source::AudioSource;
pub use engine::{EngineFactory, SpeechEngine};
pub use tts::synthesizer::Synthesizer;
pub use vad::scorer::SpeechScorer;

// Pipeline
pub use audio::capture::{AudioFrame, CaptureSession};
pub use engine::pool::EnginePool;
pub use pipeline::coordinator::{PipelineEvent, SpeechPipeline};
pub use vad::segmenter::Segmenter;

// Results and events
pub use engine::RecognitionResult;
pub use kws::{KeywordDetection, KwsSession};
pub use streaming::session::{StreamingEvent, StreamingSession};
pub use tts::cached::CachedSynthesizer;
pub use tts::synthesizer::TtsResult;
pub use vad::segment::SpeechSegment;

// Error handling
pub use error::{Result, VoiceKitError};

// Config
pub use config::Config;

// Logging side-channel
pub use cancel::CancelFlag;
pub use logging::{LogSink, Logger, Severity};
