//! Keyword spotting: always-on streaming detection.
//!
//! Streaming 1:1 like online recognition: one stream per engine. The
//! session auto-resets the stream after each detection so spotting
//! continues immediately.

use crate::error::{Result, VoiceKitError};
use crate::events::EventBus;
use crate::logging::{Logger, Severity, stderr_logger};
use crossbeam_channel::Receiver;
use std::sync::Mutex;

/// Opaque keyword spotter capability.
///
/// Wraps one native spotting stream. Stateful and not safe for concurrent
/// calls; [`KwsSession`] serializes access.
pub trait KeywordEngine: Send {
    /// Buffers a span of PCM samples.
    fn accept_samples(&mut self, samples: &[f32], sample_rate: u32);

    /// True while buffered audio remains to decode.
    fn can_decode(&self) -> bool;

    /// Runs one decode step.
    fn decode(&mut self);

    /// Keyword detected by the latest decode, if any.
    fn detected_keyword(&self) -> Option<String>;

    /// Clears the stream so spotting continues fresh.
    fn reset(&mut self);

    /// Signals end of input so remaining frames can be decoded.
    fn input_finished(&mut self);
}

/// A detected keyword occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordDetection {
    pub keyword: String,
}

struct KwsState<E> {
    engine: Option<E>,
    active: bool,
}

/// Manages one keyword engine and its always-on listening session.
pub struct KwsSession<E: KeywordEngine> {
    state: Mutex<KwsState<E>>,
    events: EventBus<KeywordDetection>,
    logger: Logger,
}

impl<E: KeywordEngine> KwsSession<E> {
    pub fn new() -> Self {
        Self::with_logger(stderr_logger())
    }

    pub fn with_logger(logger: Logger) -> Self {
        Self {
            state: Mutex::new(KwsState {
                engine: None,
                active: false,
            }),
            events: EventBus::new(),
            logger,
        }
    }

    /// Installs an engine, replacing any previous one.
    pub fn load(&self, engine: E) -> Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| VoiceKitError::Other(format!("kws session state poisoned: {}", e)))?;
        state.engine = Some(engine);
        state.active = false;
        self.logger.emit(Severity::Info, "keyword spotter loaded");
        Ok(())
    }

    /// Drops the engine. Ends any active session first. Idempotent.
    pub fn unload(&self) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        if state.engine.is_none() {
            return;
        }

        if state.active
            && let Some(engine) = state.engine.as_mut()
        {
            engine.input_finished();
            while engine.can_decode() {
                engine.decode();
            }
        }
        state.engine = None;
        state.active = false;
        drop(state);

        self.logger.emit(Severity::Info, "keyword spotter unloaded");
    }

    /// Alias for [`unload`](Self::unload); safe to call repeatedly.
    pub fn dispose(&self) {
        self.unload();
        self.events.clear();
    }

    pub fn is_loaded(&self) -> bool {
        self.state
            .lock()
            .map(|s| s.engine.is_some())
            .unwrap_or(false)
    }

    pub fn is_session_active(&self) -> bool {
        self.state.lock().map(|s| s.active).unwrap_or(false)
    }

    /// Subscribes to keyword detections.
    pub fn subscribe(&self) -> Receiver<KeywordDetection> {
        self.events.subscribe()
    }

    /// Opens a spotting session. No-op while one is already active.
    pub fn start_session(&self) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        if state.engine.is_none() {
            drop(state);
            self.logger.emit(
                Severity::Error,
                "kws session: cannot start, engine not loaded",
            );
            return;
        }
        if state.active {
            return;
        }

        if let Some(engine) = state.engine.as_mut() {
            engine.reset();
        }
        state.active = true;
        drop(state);

        self.logger.emit(Severity::Info, "kws session started");
    }

    /// Closes the session: finishes input and drains pending decodes.
    pub fn stop_session(&self) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        if !state.active {
            return;
        }

        if let Some(engine) = state.engine.as_mut() {
            engine.input_finished();
            while engine.can_decode() {
                engine.decode();
            }
        }
        state.active = false;
        drop(state);

        self.logger.emit(Severity::Info, "kws session stopped");
    }

    /// Buffers samples into the active session. Dropped when inactive.
    pub fn accept_samples(&self, samples: &[f32], sample_rate: u32) {
        if samples.is_empty() {
            return;
        }
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        if !state.active {
            return;
        }
        if let Some(engine) = state.engine.as_mut() {
            engine.accept_samples(samples, sample_rate);
        }
    }

    /// Drains ready decode steps and publishes any detected keyword.
    ///
    /// After a detection the stream auto-resets so spotting continues
    /// immediately. The event fires outside the lock.
    pub fn process_available(&self) {
        let detection = {
            let Ok(mut state) = self.state.lock() else {
                return;
            };
            if !state.active {
                return;
            }
            let Some(engine) = state.engine.as_mut() else {
                return;
            };

            while engine.can_decode() {
                engine.decode();
            }

            match engine.detected_keyword() {
                Some(keyword) if !keyword.is_empty() => {
                    engine.reset();
                    Some(KeywordDetection { keyword })
                }
                _ => None,
            }
        };

        if let Some(detection) = detection {
            self.logger.emit(
                Severity::Debug,
                &format!("keyword detected: {}", detection.keyword),
            );
            self.events.publish(detection);
        }
    }
}

impl<E: KeywordEngine> Default for KwsSession<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NullSink;
    use std::sync::Arc;

    /// Scripted spotter: fires the queued keywords one per decode batch.
    #[derive(Default)]
    struct ScriptedKeywordEngine {
        buffered: usize,
        hits: Vec<Option<String>>,
        cursor: usize,
    }

    impl ScriptedKeywordEngine {
        fn new(hits: Vec<Option<&str>>) -> Self {
            Self {
                hits: hits
                    .into_iter()
                    .map(|h| h.map(|s| s.to_string()))
                    .collect(),
                ..Default::default()
            }
        }
    }

    impl KeywordEngine for ScriptedKeywordEngine {
        fn accept_samples(&mut self, samples: &[f32], _sample_rate: u32) {
            self.buffered += samples.len();
        }

        fn can_decode(&self) -> bool {
            self.buffered > 0
        }

        fn decode(&mut self) {
            self.buffered = 0;
            if self.cursor < self.hits.len() {
                self.cursor += 1;
            }
        }

        fn detected_keyword(&self) -> Option<String> {
            if self.cursor == 0 {
                return None;
            }
            self.hits[(self.cursor - 1).min(self.hits.len() - 1)].clone()
        }

        fn reset(&mut self) {
            // A reset consumes the pending hit.
            if self.cursor > 0 {
                let idx = (self.cursor - 1).min(self.hits.len() - 1);
                self.hits[idx] = None;
            }
        }

        fn input_finished(&mut self) {}
    }

    fn session_with(hits: Vec<Option<&str>>) -> KwsSession<ScriptedKeywordEngine> {
        let session = KwsSession::with_logger(Arc::new(NullSink));
        session.load(ScriptedKeywordEngine::new(hits)).unwrap();
        session
    }

    #[test]
    fn test_detection_fires_event() {
        let session = session_with(vec![Some("hey kit")]);
        let rx = session.subscribe();

        session.start_session();
        session.accept_samples(&[0.1; 160], 16000);
        session.process_available();

        assert_eq!(
            rx.try_recv().unwrap(),
            KeywordDetection {
                keyword: "hey kit".to_string()
            }
        );
    }

    #[test]
    fn test_auto_reset_keeps_spotting() {
        let session = session_with(vec![Some("hey kit"), Some("hey kit")]);
        let rx = session.subscribe();

        session.start_session();
        session.accept_samples(&[0.1; 160], 16000);
        session.process_available();
        // The first hit was consumed by the auto-reset; the next batch
        // produces a fresh detection.
        session.accept_samples(&[0.1; 160], 16000);
        session.process_available();

        assert_eq!(rx.try_iter().count(), 2);
    }

    #[test]
    fn test_no_keyword_publishes_nothing() {
        let session = session_with(vec![None, None]);
        let rx = session.subscribe();

        session.start_session();
        session.accept_samples(&[0.1; 160], 16000);
        session.process_available();

        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_inactive_session_drops_samples() {
        let session = session_with(vec![Some("never")]);
        let rx = session.subscribe();

        session.accept_samples(&[0.1; 160], 16000);
        session.process_available();

        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_start_requires_loaded_engine() {
        let session: KwsSession<ScriptedKeywordEngine> =
            KwsSession::with_logger(Arc::new(NullSink));
        session.start_session();
        assert!(!session.is_session_active());
    }

    #[test]
    fn test_stop_and_dispose_idempotent() {
        let session = session_with(vec![Some("x")]);
        session.start_session();

        session.stop_session();
        session.stop_session();
        session.dispose();
        session.dispose();
        assert!(!session.is_loaded());
    }
}
