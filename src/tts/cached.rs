//! Caching decorator over a synthesizer.
//!
//! Memoizes generation on the request fingerprint (text, speed, speaker).
//! Write-through: a valid fresh result is stored before being returned.
//! The cache can be toggled at runtime; disabling clears it. Callers switch
//! voices/profiles by clearing explicitly: cached audio from another voice
//! must never be served.

use crate::config::TtsConfig;
use crate::error::Result;
use crate::logging::{Logger, Severity, stderr_logger};
use crate::tts::cache::{CacheKey, TtsResultCache};
use crate::tts::synthesizer::{Synthesizer, TtsResult};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Decorator adding LRU result caching to a [`Synthesizer`].
pub struct CachedSynthesizer<S: Synthesizer> {
    inner: S,
    cache: TtsResultCache,
    enabled: AtomicBool,
    default_speed: f32,
    default_speaker: i32,
    logger: Logger,
}

impl<S: Synthesizer> CachedSynthesizer<S> {
    pub fn new(inner: S, config: &TtsConfig) -> Self {
        Self::with_logger(inner, config, stderr_logger())
    }

    pub fn with_logger(inner: S, config: &TtsConfig, logger: Logger) -> Self {
        Self {
            inner,
            cache: TtsResultCache::with_logger(config.cache_size, Arc::clone(&logger)),
            enabled: AtomicBool::new(config.cache_enabled),
            default_speed: config.speed,
            default_speaker: config.speaker_id,
            logger,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.inner.is_ready()
    }

    /// Generates speech with the configured default speed and speaker.
    pub fn generate(&self, text: &str) -> Result<TtsResult> {
        self.generate_with(text, self.default_speed, self.default_speaker)
    }

    /// Generates speech, consulting the cache first.
    ///
    /// A hit returns an independent copy of the cached audio without
    /// touching the inner synthesizer. A valid fresh result is stored
    /// write-through before being returned.
    pub fn generate_with(&self, text: &str, speed: f32, speaker_id: i32) -> Result<TtsResult> {
        if !self.cache_enabled() {
            return self.inner.generate(text, speed, speaker_id);
        }

        let key = CacheKey::new(text, speed, speaker_id);
        if let Some(hit) = self.cache.try_get(&key) {
            self.logger
                .emit(Severity::Debug, &format!("tts cache hit: {}", key));
            return Ok(hit);
        }

        let result = self.inner.generate(text, speed, speaker_id)?;
        if result.is_valid() {
            self.cache.add(key, &result);
        }
        Ok(result)
    }

    pub fn cache_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Toggles caching. Disabling drops all cached entries.
    pub fn set_cache_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
        if !enabled {
            self.cache.clear();
        }
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn cache_max_size(&self) -> usize {
        self.cache.max_size()
    }

    /// Changes cache capacity; shrinking evicts immediately.
    pub fn set_cache_max_size(&self, max_size: usize) {
        self.cache.set_max_size(max_size);
    }

    /// Drops all cached entries. Call when the active voice or profile
    /// changes.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

impl<S: Synthesizer + 'static> CachedSynthesizer<S> {
    /// Runs [`generate_with`](Self::generate_with) on a blocking worker
    /// thread.
    pub async fn generate_async(
        self: &Arc<Self>,
        text: String,
        speed: f32,
        speaker_id: i32,
    ) -> Result<TtsResult> {
        let this = Arc::clone(self);
        tokio::task::spawn_blocking(move || this.generate_with(&text, speed, speaker_id))
            .await
            .map_err(|e| crate::error::VoiceKitError::Synthesis {
                message: format!("synthesis task failed: {}", e),
            })?
    }
}
