//! Audio source abstraction.

use crate::defaults;
use crate::error::{Result, VoiceKitError};

/// Trait for audio input devices.
///
/// This trait allows swapping implementations (real capture device vs mock).
/// Samples are interleaved 32-bit float PCM in [-1.0, 1.0].
pub trait AudioSource: Send {
    /// Start capturing audio from the source.
    fn start(&mut self) -> Result<()>;

    /// Stop capturing audio from the source.
    fn stop(&mut self) -> Result<()>;

    /// Read samples accumulated since the last call.
    ///
    /// Returns an empty vector (not an error) when nothing new is available.
    fn read_samples(&mut self) -> Result<Vec<f32>>;

    /// Sample rate of the delivered audio in Hz.
    fn sample_rate(&self) -> u32 {
        defaults::SAMPLE_RATE
    }

    /// Number of interleaved channels.
    fn channels(&self) -> u16 {
        defaults::CHANNELS
    }
}

/// Mock audio source for testing
#[derive(Debug, Clone)]
pub struct MockAudioSource {
    is_started: bool,
    samples: Vec<f32>,
    should_fail_start: bool,
    should_fail_read: bool,
    error_message: String,
}

impl MockAudioSource {
    /// Create a new mock audio source with default settings
    pub fn new() -> Self {
        Self {
            is_started: false,
            samples: vec![0.0; 160],
            should_fail_start: false,
            should_fail_read: false,
            error_message: "mock audio error".to_string(),
        }
    }

    /// Configure the mock to return specific samples on every read
    pub fn with_samples(mut self, samples: Vec<f32>) -> Self {
        self.samples = samples;
        self
    }

    /// Configure the mock to fail on start
    pub fn with_start_failure(mut self) -> Self {
        self.should_fail_start = true;
        self
    }

    /// Configure the mock to fail on read
    pub fn with_read_failure(mut self) -> Self {
        self.should_fail_read = true;
        self
    }

    /// Configure the error message for failures
    pub fn with_error_message(mut self, message: &str) -> Self {
        self.error_message = message.to_string();
        self
    }

    /// Check if the audio source is started
    pub fn is_started(&self) -> bool {
        self.is_started
    }
}

impl Default for MockAudioSource {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSource for MockAudioSource {
    fn start(&mut self) -> Result<()> {
        if self.should_fail_start {
            Err(VoiceKitError::AudioCapture {
                message: self.error_message.clone(),
            })
        } else {
            self.is_started = true;
            Ok(())
        }
    }

    fn stop(&mut self) -> Result<()> {
        self.is_started = false;
        Ok(())
    }

    fn read_samples(&mut self) -> Result<Vec<f32>> {
        if self.should_fail_read {
            Err(VoiceKitError::AudioCapture {
                message: self.error_message.clone(),
            })
        } else {
            Ok(self.samples.clone())
        }
    }
}

/// Audio source that plays back a fixed buffer in chunks, then runs dry.
///
/// Unlike [`MockAudioSource`] this is finite, which makes it useful for
/// feeding deterministic scenarios through the capture session.
#[derive(Debug, Clone)]
pub struct ScriptedAudioSource {
    samples: Vec<f32>,
    position: usize,
    chunk_size: usize,
}

impl ScriptedAudioSource {
    pub fn new(samples: Vec<f32>, chunk_size: usize) -> Self {
        Self {
            samples,
            position: 0,
            chunk_size: chunk_size.max(1),
        }
    }

    /// True once every sample has been read.
    pub fn exhausted(&self) -> bool {
        self.position >= self.samples.len()
    }
}

impl AudioSource for ScriptedAudioSource {
    fn start(&mut self) -> Result<()> {
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_samples(&mut self) -> Result<Vec<f32>> {
        if self.exhausted() {
            return Ok(Vec::new());
        }
        let end = (self.position + self.chunk_size).min(self.samples.len());
        let chunk = self.samples[self.position..end].to_vec();
        self.position = end;
        Ok(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_returns_configured_samples() {
        let test_samples = vec![0.1f32, 0.2, 0.3];
        let mut source = MockAudioSource::new().with_samples(test_samples.clone());

        let result = source.read_samples();

        assert!(result.is_ok());
        assert_eq!(result.unwrap(), test_samples);
    }

    #[test]
    fn test_mock_default_samples_are_silence() {
        let mut source = MockAudioSource::new();
        let samples = source.read_samples().unwrap();
        assert_eq!(samples.len(), 160);
        assert!(samples.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_mock_read_failure() {
        let mut source = MockAudioSource::new()
            .with_read_failure()
            .with_error_message("buffer overrun");

        match source.read_samples() {
            Err(VoiceKitError::AudioCapture { message }) => {
                assert_eq!(message, "buffer overrun");
            }
            _ => panic!("Expected AudioCapture error"),
        }
    }

    #[test]
    fn test_mock_start_stop_state() {
        let mut source = MockAudioSource::new();
        assert!(!source.is_started());

        source.start().unwrap();
        assert!(source.is_started());

        source.stop().unwrap();
        assert!(!source.is_started());
    }

    #[test]
    fn test_mock_start_failure_leaves_stopped() {
        let mut source = MockAudioSource::new().with_start_failure();
        assert!(source.start().is_err());
        assert!(!source.is_started());
    }

    #[test]
    fn test_default_format() {
        let source = MockAudioSource::new();
        assert_eq!(source.sample_rate(), 16000);
        assert_eq!(source.channels(), 1);
    }

    #[test]
    fn test_trait_is_object_safe() {
        let mut source: Box<dyn AudioSource> =
            Box::new(MockAudioSource::new().with_samples(vec![0.5f32; 4]));

        assert!(source.start().is_ok());
        assert_eq!(source.read_samples().unwrap(), vec![0.5f32; 4]);
        assert!(source.stop().is_ok());
    }

    #[test]
    fn test_scripted_source_runs_dry() {
        let mut source = ScriptedAudioSource::new(vec![0.1f32; 10], 4);

        assert_eq!(source.read_samples().unwrap().len(), 4);
        assert_eq!(source.read_samples().unwrap().len(), 4);
        assert_eq!(source.read_samples().unwrap().len(), 2);
        assert!(source.exhausted());
        assert!(source.read_samples().unwrap().is_empty());
    }
}
