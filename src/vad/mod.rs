//! Voice activity detection: per-window scoring and speech segmentation.

pub mod scorer;
pub mod segment;
pub mod segmenter;

pub use scorer::{EnergyScorer, SpeechScorer, rms};
pub use segment::SpeechSegment;
pub use segmenter::{Segmenter, VadState, VadTransition};
