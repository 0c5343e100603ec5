//! Opaque inference engine abstraction.
//!
//! Native recognizers are consumed through the narrow [`SpeechEngine`]
//! capability. Handles are stateful and not safe for concurrent calls, so
//! all access goes through the [`pool`](crate::engine::pool) checkout
//! discipline. Construction goes through an [`EngineFactory`] supplied by
//! the embedding application.

pub mod pool;

use crate::error::{Result, VoiceKitError};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub use pool::EnginePool;

/// Recognition output for one audio span.
#[derive(Debug, Clone, Default)]
pub struct RecognitionResult {
    /// Recognized text. Empty text marks an invalid result.
    pub text: String,
    /// Per-token strings, when the engine provides them.
    pub tokens: Vec<String>,
    /// Per-token start times in seconds, when the engine provides them.
    pub timestamps: Vec<f32>,
}

impl RecognitionResult {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tokens: Vec::new(),
            timestamps: Vec::new(),
        }
    }

    /// True when the result carries usable text.
    pub fn is_valid(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// One opaque, stateful engine handle.
///
/// Not safe for concurrent calls; the pool guarantees at most one caller
/// per handle at a time. Dropping a handle releases its native context.
pub trait SpeechEngine: Send {
    /// Runs inference over the given PCM span.
    fn recognize(&mut self, samples: &[f32], sample_rate: u32) -> Result<RecognitionResult>;
}

/// Builds engine handles for a pool.
///
/// A single factory may be asked for several handles (initial load, pool
/// growth). Each build may fail independently; the pool logs and skips
/// failed handles.
pub trait EngineFactory: Send + Sync {
    type Engine: SpeechEngine + 'static;

    /// Profile name used in log messages.
    fn profile(&self) -> &str;

    /// Builds one engine handle.
    fn build(&self) -> Result<Self::Engine>;
}

/// Tracks how many callers are inside native calls simultaneously.
///
/// Shared between stub engines in tests to prove the pool's mutual
/// exclusion guarantee.
#[derive(Debug, Clone, Default)]
pub struct ConcurrencyGauge {
    current: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl ConcurrencyGauge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a call entry and updates the observed peak.
    pub fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    /// Marks a call exit.
    pub fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    /// Highest number of simultaneous calls observed.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Mock engine for testing
#[derive(Debug, Clone)]
pub struct MockEngine {
    response: String,
    should_fail: bool,
    delay: Duration,
    gauge: Option<ConcurrencyGauge>,
}

impl MockEngine {
    /// Create a new mock engine with default settings
    pub fn new() -> Self {
        Self {
            response: "mock recognition".to_string(),
            should_fail: false,
            delay: Duration::ZERO,
            gauge: None,
        }
    }

    /// Configure the mock to return a specific response
    pub fn with_response(mut self, response: &str) -> Self {
        self.response = response.to_string();
        self
    }

    /// Configure the mock to fail on recognize
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Configure the mock to sleep inside each recognize call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Attach a concurrency gauge spanning the simulated native call
    pub fn with_gauge(mut self, gauge: ConcurrencyGauge) -> Self {
        self.gauge = Some(gauge);
        self
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechEngine for MockEngine {
    fn recognize(&mut self, _samples: &[f32], _sample_rate: u32) -> Result<RecognitionResult> {
        if let Some(gauge) = &self.gauge {
            gauge.enter();
        }
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        if let Some(gauge) = &self.gauge {
            gauge.exit();
        }

        if self.should_fail {
            Err(VoiceKitError::Recognition {
                message: "mock recognition failure".to_string(),
            })
        } else {
            Ok(RecognitionResult::new(self.response.clone()))
        }
    }
}

/// Mock factory producing [`MockEngine`]s.
///
/// Individual builds can be scripted to fail, mimicking native construction
/// errors such as unsupported quantization on the target hardware.
#[derive(Debug)]
pub struct MockEngineFactory {
    profile: String,
    template: MockEngine,
    failing_builds: Vec<usize>,
    fail_all: bool,
    built: AtomicUsize,
}

impl MockEngineFactory {
    pub fn new(profile: &str) -> Self {
        Self {
            profile: profile.to_string(),
            template: MockEngine::new(),
            failing_builds: Vec::new(),
            fail_all: false,
            built: AtomicUsize::new(0),
        }
    }

    /// Engine template cloned for every successful build
    pub fn with_engine(mut self, template: MockEngine) -> Self {
        self.template = template;
        self
    }

    /// Builds at the given zero-based indices fail
    pub fn with_failing_builds(mut self, indices: Vec<usize>) -> Self {
        self.failing_builds = indices;
        self
    }

    /// Every build fails
    pub fn with_all_builds_failing(mut self) -> Self {
        self.fail_all = true;
        self
    }

    /// Number of build attempts so far
    pub fn build_attempts(&self) -> usize {
        self.built.load(Ordering::SeqCst)
    }
}

impl EngineFactory for MockEngineFactory {
    type Engine = MockEngine;

    fn profile(&self) -> &str {
        &self.profile
    }

    fn build(&self) -> Result<Self::Engine> {
        let index = self.built.fetch_add(1, Ordering::SeqCst);
        if self.fail_all || self.failing_builds.contains(&index) {
            Err(VoiceKitError::EngineBuild {
                message: format!("scripted failure for handle {}", index),
            })
        } else {
            Ok(self.template.clone())
        }
    }
}

impl Default for MockEngineFactory {
    fn default() -> Self {
        Self::new("mock")
    }
}
