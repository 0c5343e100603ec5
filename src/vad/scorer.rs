//! Per-window speech scoring.
//!
//! The segmenter consumes a score in [0.0, 1.0] per window. The default
//! scorer is energy-based; a model-backed scorer wrapping an opaque detector
//! plugs in through the same trait.

/// Produces a speech probability/energy score for one audio window.
pub trait SpeechScorer: Send {
    /// Scores a window of PCM samples. Higher means more speech-like.
    fn score(&mut self, window: &[f32]) -> f32;

    /// True when the scorer can produce meaningful scores.
    fn is_ready(&self) -> bool {
        true
    }

    /// Clears any internal state carried across windows.
    fn reset(&mut self) {}
}

/// RMS-energy scorer.
///
/// Treats normalized signal energy as a speech proxy. Adequate for quiet
/// environments and tests; production setups typically substitute a
/// model-backed scorer.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnergyScorer;

impl SpeechScorer for EnergyScorer {
    fn score(&mut self, window: &[f32]) -> f32 {
        rms(window)
    }
}

/// Calculates the Root Mean Square (RMS) of normalized f32 samples.
///
/// # Returns
/// RMS value where 0.0 is silence, ~0.707 a full-scale sine wave and 1.0
/// a maximum-amplitude square wave.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_squares / samples.len() as f64).sqrt() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rms_silence_is_zero() {
        let silence = vec![0.0f32; 1000];
        assert_eq!(rms(&silence), 0.0);
    }

    #[test]
    fn test_rms_full_scale_square_wave() {
        let signal = vec![1.0f32; 1000];
        assert!((rms(&signal) - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_rms_negative_samples() {
        let signal = vec![-1.0f32; 1000];
        assert!(rms(&signal) > 0.99);
    }

    #[test]
    fn test_rms_sine_wave() {
        let signal: Vec<f32> = (0..1000)
            .map(|i| (i as f32 * std::f32::consts::TAU / 100.0).sin())
            .collect();
        let value = rms(&signal);
        assert!(
            (value - std::f32::consts::FRAC_1_SQRT_2).abs() < 0.01,
            "RMS of a sine should be ~0.707, got {}",
            value
        );
    }

    #[test]
    fn test_rms_empty_samples() {
        assert_eq!(rms(&[]), 0.0);
    }

    #[test]
    fn test_energy_scorer_uses_rms() {
        let mut scorer = EnergyScorer;
        assert_eq!(scorer.score(&[0.0; 100]), 0.0);
        assert!(scorer.score(&[0.5; 100]) > 0.4);
        assert!(scorer.is_ready());
    }
}
