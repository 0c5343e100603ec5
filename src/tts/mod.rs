//! Text-to-speech: synthesis capability, LRU result caching.

pub mod cache;
pub mod cached;
pub mod synthesizer;

pub use cache::{CacheKey, TtsResultCache};
pub use cached::CachedSynthesizer;
pub use synthesizer::{MockSynthesizer, Synthesizer, TtsResult};
