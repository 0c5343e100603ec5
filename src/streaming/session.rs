//! Online recognition session over an opaque streaming engine.

use crate::engine::RecognitionResult;
use crate::error::{Result, VoiceKitError};
use crate::events::EventBus;
use crate::logging::{Logger, Severity, stderr_logger};
use crossbeam_channel::Receiver;
use std::sync::Mutex;

/// Opaque streaming recognizer capability.
///
/// Wraps one native online stream. Stateful and not safe for concurrent
/// calls; [`StreamingSession`] serializes access.
pub trait StreamingEngine: Send {
    /// Buffers a span of PCM samples.
    fn accept_samples(&mut self, samples: &[f32], sample_rate: u32);

    /// True while buffered audio remains to decode.
    fn can_decode(&self) -> bool;

    /// Runs one decode step.
    fn decode(&mut self);

    /// Current hypothesis for the active utterance.
    fn current_result(&self) -> RecognitionResult;

    /// True when the engine detected an utterance boundary.
    fn is_endpoint(&self) -> bool;

    /// Clears the active utterance so decoding continues fresh.
    fn reset(&mut self);

    /// Signals end of input so remaining frames can be decoded.
    fn input_finished(&mut self);
}

/// Notifications published by a streaming session.
#[derive(Debug, Clone)]
pub enum StreamingEvent {
    /// Hypothesis for the utterance still in progress.
    Partial(RecognitionResult),
    /// Hypothesis finalized at an utterance boundary.
    Final(RecognitionResult),
    /// An utterance boundary was detected.
    Endpoint,
}

struct SessionState<E> {
    engine: Option<E>,
    active: bool,
}

/// Manages one streaming engine and its session lifecycle.
///
/// Thread-safe: a single lock serializes engine access, and events fire
/// outside the lock.
pub struct StreamingSession<E: StreamingEngine> {
    state: Mutex<SessionState<E>>,
    events: EventBus<StreamingEvent>,
    logger: Logger,
}

impl<E: StreamingEngine> StreamingSession<E> {
    pub fn new() -> Self {
        Self::with_logger(stderr_logger())
    }

    pub fn with_logger(logger: Logger) -> Self {
        Self {
            state: Mutex::new(SessionState {
                engine: None,
                active: false,
            }),
            events: EventBus::new(),
            logger,
        }
    }

    /// Installs an engine, replacing any previous one.
    pub fn load(&self, engine: E) -> Result<()> {
        let mut state = self.lock_state()?;
        state.engine = Some(engine);
        state.active = false;
        self.logger
            .emit(Severity::Info, "streaming recognizer loaded");
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

        self.logger
            .emit(Severity::Info, "streaming recognizer unloaded");
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

    /// Subscribes to partial/final/endpoint notifications.
    pub fn subscribe(&self) -> Receiver<StreamingEvent> {
        self.events.subscribe()
    }

    /// Opens a decoding session. No-op while one is already active.
    pub fn start_session(&self) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        if state.engine.is_none() {
            drop(state);
            self.logger.emit(
                Severity::Error,
                "streaming session: cannot start, engine not loaded",
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

        self.logger
            .emit(Severity::Info, "streaming session started");
    }

    /// Closes the session: finishes input and drains pending decodes.
    /// No-op when no session is active.
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

        self.logger
            .emit(Severity::Info, "streaming session stopped");
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

    /// Drains ready decode steps and publishes the current hypothesis.
    ///
    /// At an utterance boundary the hypothesis goes out as `Final` followed
    /// by `Endpoint`, and the stream resets so recognition continues with
    /// the next utterance. Otherwise a non-empty hypothesis goes out as
    /// `Partial`. Empty text publishes nothing.
    pub fn process_available(&self) {
        let mut pending = Vec::new();

        {
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

            let result = engine.current_result();
            if result.is_valid() {
                if engine.is_endpoint() {
                    pending.push(StreamingEvent::Final(result));
                    pending.push(StreamingEvent::Endpoint);
                    engine.reset();
                } else {
                    pending.push(StreamingEvent::Partial(result));
                }
            }
        }

        // Fire outside the lock so a subscriber calling back in cannot
        // deadlock.
        for event in pending {
            self.events.publish(event);
        }
    }

    fn lock_state(&self) -> Result<std::sync::MutexGuard<'_, SessionState<E>>> {
        self.state
            .lock()
            .map_err(|e| VoiceKitError::Other(format!("streaming session state poisoned: {}", e)))
    }
}

impl<E: StreamingEngine> Default for StreamingSession<E> {
    fn default() -> Self {
        Self::new()
    }
}
