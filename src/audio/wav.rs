//! WAV file helpers.
//!
//! Loads fixture and playback audio as mono f32 PCM at a target rate, and
//! writes synthesis output back to disk. Supports arbitrary source rates and
//! channel counts with software downmix and resampling.

use crate::error::{Result, VoiceKitError};
use std::path::Path;

/// Reads a WAV file as mono f32 samples resampled to `target_rate`.
pub fn load_mono(path: &Path, target_rate: u32) -> Result<Vec<f32>> {
    let mut reader = hound::WavReader::open(path).map_err(|e| VoiceKitError::AudioCapture {
        message: format!("Failed to open WAV file '{}': {}", path.display(), e),
    })?;

    let spec = reader.spec();
    let channels = spec.channels as usize;

    let raw: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| VoiceKitError::AudioCapture {
                message: format!("Failed to read WAV samples: {}", e),
            })?,
        hound::SampleFormat::Int => reader
            .samples::<i16>()
            .map(|s| s.map(|v| v as f32 / i16::MAX as f32))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| VoiceKitError::AudioCapture {
                message: format!("Failed to read WAV samples: {}", e),
            })?,
    };

    let mono = mix_to_mono(&raw, channels);

    if spec.sample_rate == target_rate {
        Ok(mono)
    } else {
        Ok(resample(&mono, spec.sample_rate, target_rate))
    }
}

/// Writes mono f32 samples as a 16-bit PCM WAV file.
pub fn save_mono(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec).map_err(|e| {
        VoiceKitError::AudioCapture {
            message: format!("Failed to create WAV file '{}': {}", path.display(), e),
        }
    })?;

    for &sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer
            .write_sample(value)
            .map_err(|e| VoiceKitError::AudioCapture {
                message: format!("Failed to write WAV sample: {}", e),
            })?;
    }

    writer.finalize().map_err(|e| VoiceKitError::AudioCapture {
        message: format!("Failed to finalize WAV file: {}", e),
    })
}

/// Mix interleaved multi-channel audio down to mono by averaging channels.
pub fn mix_to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }

    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Simple linear interpolation resampling.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).ceil() as usize;

    (0..output_len)
        .map(|i| {
            let source_pos = i as f64 * ratio;
            let source_idx = source_pos.floor() as usize;
            let fraction = source_pos - source_idx as f64;

            if source_idx + 1 >= samples.len() {
                samples[samples.len() - 1]
            } else {
                let left = samples[source_idx] as f64;
                let right = samples[source_idx + 1] as f64;
                (left + (right - left) * fraction) as f32
            }
        })
        .collect()
}
