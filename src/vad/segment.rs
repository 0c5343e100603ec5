//! Detected speech segment.

/// A bounded span of audio judged to contain one utterance.
///
/// Owns an independent copy of the samples; the segmenter retains nothing
/// once a segment is drained.
#[derive(Debug, Clone)]
pub struct SpeechSegment {
    /// Start sample index in the original stream.
    pub start_sample: u64,
    /// PCM audio samples of the speech segment.
    pub samples: Vec<f32>,
    /// Sample rate the segment was captured at.
    pub sample_rate: u32,
}

impl SpeechSegment {
    pub fn new(start_sample: u64, samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            start_sample,
            samples,
            sample_rate,
        }
    }

    /// Start time in seconds based on sample rate.
    pub fn start_time(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.start_sample as f32 / self.sample_rate as f32
    }

    /// Duration in seconds based on sample rate.
    pub fn duration(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
