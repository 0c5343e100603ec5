//! Synthesis capability.

use crate::error::{Result, VoiceKitError};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Synthesized audio.
#[derive(Debug, Clone, Default)]
pub struct TtsResult {
    /// Mono PCM samples in [-1.0, 1.0].
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl TtsResult {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// True when the result carries playable audio.
    pub fn is_valid(&self) -> bool {
        !self.samples.is_empty() && self.sample_rate > 0
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Trait for text-to-speech generation.
///
/// Implementations wrap an opaque synthesis engine; they are free to pool
/// handles internally. Failures surface as errors here and become logged
/// empty results at the service boundary.
pub trait Synthesizer: Send + Sync {
    /// Generates speech for `text` at the given speed and speaker voice.
    fn generate(&self, text: &str, speed: f32, speaker_id: i32) -> Result<TtsResult>;

    /// Check if the synthesizer is ready
    fn is_ready(&self) -> bool;
}

/// Mock synthesizer for testing
#[derive(Debug)]
pub struct MockSynthesizer {
    samples: Vec<f32>,
    sample_rate: u32,
    should_fail: bool,
    calls: AtomicUsize,
}

impl MockSynthesizer {
    /// Create a new mock synthesizer with default settings
    pub fn new() -> Self {
        Self {
            samples: vec![0.1; 1600],
            sample_rate: 22050,
            should_fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Configure the mock to return specific samples
    pub fn with_samples(mut self, samples: Vec<f32>, sample_rate: u32) -> Self {
        self.samples = samples;
        self.sample_rate = sample_rate;
        self
    }

    /// Configure the mock to fail on generate
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Number of generate calls that reached this synthesizer
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Synthesizer for MockSynthesizer {
    fn generate(&self, _text: &str, _speed: f32, _speaker_id: i32) -> Result<TtsResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.should_fail {
            Err(VoiceKitError::Synthesis {
                message: "mock synthesis failure".to_string(),
            })
        } else {
            Ok(TtsResult::new(self.samples.clone(), self.sample_rate))
        }
    }

    fn is_ready(&self) -> bool {
        !self.should_fail
    }
}
