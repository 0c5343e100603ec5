//! Configuration profiles for the voice pipeline.
//!
//! The pipeline components consume already-validated values from these
//! structs; parsing and defaulting live only here. Settings persistence and
//! import/export workflows belong to the embedding application.

use crate::defaults;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub capture: CaptureConfig,
    pub vad: VadConfig,
    pub recognizer: RecognizerConfig,
    pub tts: TtsConfig,
}

/// Audio capture configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CaptureConfig {
    /// Input device name. `None` selects the platform default.
    pub device: Option<String>,
    pub sample_rate: u32,
    pub channels: u16,
    /// Ring buffer length in seconds.
    pub buffer_secs: u32,
    /// Polling interval for the capture ticker in milliseconds.
    pub poll_interval_ms: u64,
}

/// Voice activity detection configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VadConfig {
    /// Analysis window size in samples. Every window fed to the segmenter
    /// must be exactly this size.
    pub window_size: usize,
    /// Speech-probability threshold (0.0 to 1.0), inclusive boundary.
    pub threshold: f32,
    /// Minimum speech duration in seconds before a segment opens.
    pub min_speech_secs: f32,
    /// Trailing silence in seconds before a segment closes.
    pub min_silence_secs: f32,
    /// Maximum segment duration in seconds before a forced cut.
    pub max_speech_secs: f32,
    pub sample_rate: u32,
}

/// Recognition engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RecognizerConfig {
    /// Profile name, used in log messages.
    pub profile: String,
    /// Resolved model directory. Validation happens in the engine factory.
    pub model_dir: String,
    /// Number of concurrent native engine handles.
    pub pool_size: usize,
}

/// Text-to-speech configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TtsConfig {
    pub speed: f32,
    pub speaker_id: i32,
    /// Result cache capacity in entries.
    pub cache_size: usize,
    pub cache_enabled: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device: None,
            sample_rate: defaults::SAMPLE_RATE,
            channels: defaults::CHANNELS,
            buffer_secs: defaults::RING_BUFFER_SECS,
            poll_interval_ms: defaults::POLL_INTERVAL_MS,
        }
    }
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            window_size: defaults::VAD_WINDOW_SIZE,
            threshold: defaults::VAD_THRESHOLD,
            min_speech_secs: defaults::MIN_SPEECH_SECS,
            min_silence_secs: defaults::MIN_SILENCE_SECS,
            max_speech_secs: defaults::MAX_SPEECH_SECS,
            sample_rate: defaults::SAMPLE_RATE,
        }
    }
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            profile: "default".to_string(),
            model_dir: String::new(),
            pool_size: defaults::ENGINE_POOL_SIZE,
        }
    }
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            speed: defaults::TTS_SPEED,
            speaker_id: defaults::TTS_SPEAKER_ID,
            cache_size: defaults::RESULT_CACHE_SIZE,
            cache_enabled: true,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if the file is
    /// missing. Invalid TOML is still an error.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(e) => {
                if e.downcast_ref::<std::io::Error>()
                    .map(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
                    .unwrap_or(false)
                {
                    Ok(Self::default())
                } else {
                    Err(e)
                }
            }
        }
    }
}
