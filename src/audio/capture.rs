//! Capture session: one audio source, one ring buffer, one polling ticker.
//!
//! Push model: a background ticker polls the source at a fixed interval and
//! publishes each batch of new samples as an [`AudioFrame`]. Pull model:
//! callers create [`ReadCursor`]s and drain new samples on demand with
//! [`CaptureSession::read_new`]. Emitted frames and pulled vectors are
//! independent copies; the ring storage never leaves the session.

use crate::audio::ring::{ReadCursor, RingBuffer};
use crate::audio::source::AudioSource;
use crate::cancel::CancelFlag;
use crate::config::CaptureConfig;
use crate::error::{Result, VoiceKitError};
use crate::events::EventBus;
use crate::logging::{Logger, Severity};
use crossbeam_channel::Receiver;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// One batch of captured PCM samples.
///
/// Ownership transfers fully to the receiver; the buffer is distinct from
/// the session's ring storage.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioFrame {
    /// Duration of this frame in seconds.
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / (self.sample_rate as f32 * self.channels as f32)
    }
}

/// Owns one hardware capture session and its ring buffer.
pub struct CaptureSession {
    source: Arc<Mutex<Box<dyn AudioSource>>>,
    ring: Arc<Mutex<RingBuffer>>,
    frames: Arc<EventBus<AudioFrame>>,
    running: Arc<AtomicBool>,
    ticker: Option<JoinHandle<()>>,
    poll_interval: Duration,
    sample_rate: u32,
    channels: u16,
    disposed: bool,
    logger: Logger,
}

impl CaptureSession {
    /// Creates a session around `source` using `config` for the ring length
    /// and polling cadence.
    pub fn new<A: AudioSource + 'static>(source: A, config: &CaptureConfig, logger: Logger) -> Self {
        let sample_rate = source.sample_rate();
        let channels = source.channels();
        let capacity = sample_rate as usize * config.buffer_secs.max(1) as usize * channels as usize;

        Self {
            source: Arc::new(Mutex::new(Box::new(source))),
            ring: Arc::new(Mutex::new(RingBuffer::new(capacity))),
            frames: Arc::new(EventBus::new()),
            running: Arc::new(AtomicBool::new(false)),
            ticker: None,
            poll_interval: Duration::from_millis(config.poll_interval_ms.max(1)),
            sample_rate,
            channels,
            disposed: false,
            logger,
        }
    }

    /// Starts capture and the polling ticker.
    ///
    /// Idempotent while recording. On failure nothing changes and the caller
    /// decides whether to retry.
    pub fn start(&mut self) -> Result<()> {
        self.start_with_cancel(&CancelFlag::new())
    }

    /// Like [`start`](Self::start), but aborts cleanly if `cancel` fires
    /// while the device is being brought up. Cancellation tears down the
    /// partially-started source and is not logged as an error.
    pub fn start_with_cancel(&mut self, cancel: &CancelFlag) -> Result<()> {
        if self.disposed {
            return Err(VoiceKitError::AudioCapture {
                message: "session disposed".to_string(),
            });
        }
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }
        if cancel.is_cancelled() {
            return Err(VoiceKitError::Cancelled);
        }

        self.lock_source()?.start()?;

        if cancel.is_cancelled() {
            if let Ok(mut source) = self.source.lock() {
                let _ = source.stop();
            }
            return Err(VoiceKitError::Cancelled);
        }

        if let Ok(mut ring) = self.ring.lock() {
            ring.reset();
        }
        self.running.store(true, Ordering::SeqCst);
        self.ticker = Some(self.spawn_ticker());

        self.logger.emit(
            Severity::Info,
            &format!(
                "capture started (rate={}, channels={})",
                self.sample_rate, self.channels
            ),
        );
        Ok(())
    }

    /// Ends capture and cancels the polling ticker. No-op when not recording.
    pub fn stop(&mut self) {
        if self.disposed || !self.running.load(Ordering::SeqCst) {
            return;
        }

        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.ticker.take() {
            let _ = handle.join();
        }

        if let Ok(mut source) = self.source.lock()
            && let Err(e) = source.stop()
        {
            self.logger
                .emit(Severity::Warning, &format!("capture stop failed: {}", e));
        }

        if let Ok(mut ring) = self.ring.lock() {
            ring.reset();
        }

        self.logger.emit(Severity::Info, "capture stopped");
    }

    /// Stops capture and releases resources. Every later call on this
    /// session is an inert no-op.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.stop();
        self.frames.clear();
        self.disposed = true;
    }

    pub fn is_recording(&self) -> bool {
        !self.disposed && self.running.load(Ordering::SeqCst)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Creates a pull cursor positioned at the current write position.
    pub fn cursor(&self) -> ReadCursor {
        self.ring
            .lock()
            .map(|ring| ring.cursor())
            .unwrap_or_else(|_| RingBuffer::new(1).cursor())
    }

    /// Pull model: samples written since `cursor` last read, or empty.
    pub fn read_new(&self, cursor: &mut ReadCursor) -> Vec<f32> {
        if self.disposed {
            return Vec::new();
        }
        self.ring
            .lock()
            .map(|ring| ring.read_new(cursor))
            .unwrap_or_default()
    }

    /// Entire ring buffer contents in temporal order, regardless of cursors.
    pub fn read_all(&self) -> Vec<f32> {
        if self.disposed {
            return Vec::new();
        }
        self.ring
            .lock()
            .map(|ring| ring.read_all())
            .unwrap_or_default()
    }

    /// Subscribes to push delivery. One frame per ticker poll that produced
    /// samples; empty polls are suppressed.
    pub fn subscribe(&self) -> Receiver<AudioFrame> {
        self.frames.subscribe()
    }

    fn spawn_ticker(&self) -> JoinHandle<()> {
        let source = Arc::clone(&self.source);
        let ring = Arc::clone(&self.ring);
        let frames = Arc::clone(&self.frames);
        let running = Arc::clone(&self.running);
        let logger = Arc::clone(&self.logger);
        let poll_interval = self.poll_interval;
        let sample_rate = self.sample_rate;
        let channels = self.channels;

        thread::spawn(move || {
            while running.load(Ordering::SeqCst) {
                thread::sleep(poll_interval);
                if !running.load(Ordering::SeqCst) {
                    break;
                }

                let Ok(mut source) = source.lock() else {
                    break;
                };

                match source.read_samples() {
                    Ok(samples) if !samples.is_empty() => {
                        drop(source);
                        if let Ok(mut ring) = ring.lock() {
                            ring.push(&samples);
                        }
                        frames.publish(AudioFrame {
                            samples,
                            sample_rate,
                            channels,
                        });
                    }
                    Ok(_) => {}
                    Err(e) => {
                        logger.emit(Severity::Error, &format!("capture poll failed: {}", e));
                        let _ = source.stop();
                        break;
                    }
                }
            }
            running.store(false, Ordering::SeqCst);
        })
    }

    fn lock_source(&self) -> Result<MutexGuard<'_, Box<dyn AudioSource>>> {
        self.source.lock().map_err(|e| VoiceKitError::AudioCapture {
            message: format!("Failed to lock capture source: {}", e),
        })
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::source::{MockAudioSource, ScriptedAudioSource};
    use crate::logging::{MemorySink, NullSink};

    fn test_config() -> CaptureConfig {
        CaptureConfig {
            buffer_secs: 1,
            poll_interval_ms: 1,
            ..CaptureConfig::default()
        }
    }

    fn null_logger() -> Logger {
        Arc::new(NullSink)
    }

    fn wait_for<F: FnMut() -> bool>(mut predicate: F) -> bool {
        for _ in 0..200 {
            if predicate() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn test_frame_duration() {
        let frame = AudioFrame {
            samples: vec![0.0; 8000],
            sample_rate: 16000,
            channels: 1,
        };
        assert_eq!(frame.duration_secs(), 0.5);
    }

    #[test]
    fn test_start_is_idempotent() {
        let source = MockAudioSource::new();
        let mut session = CaptureSession::new(source, &test_config(), null_logger());

        assert!(session.start().is_ok());
        assert!(session.start().is_ok());
        assert!(session.is_recording());
        session.stop();
    }

    #[test]
    fn test_start_failure_leaves_state_unchanged() {
        let source = MockAudioSource::new().with_start_failure();
        let mut session = CaptureSession::new(source, &test_config(), null_logger());

        assert!(session.start().is_err());
        assert!(!session.is_recording());
    }

    #[test]
    fn test_push_delivery_fires_with_new_samples() {
        let source = MockAudioSource::new().with_samples(vec![0.25; 160]);
        let mut session = CaptureSession::new(source, &test_config(), null_logger());
        let rx = session.subscribe();

        session.start().unwrap();
        let frame = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        session.stop();

        assert_eq!(frame.samples.len(), 160);
        assert_eq!(frame.sample_rate, 16000);
    }

    #[test]
    fn test_pull_model_reads_only_new_samples() {
        let source = MockAudioSource::new().with_samples(vec![0.5; 160]);
        let mut session = CaptureSession::new(source, &test_config(), null_logger());

        session.start().unwrap();
        let mut cursor = session.cursor();

        let mut pulled: Vec<f32> = Vec::new();
        assert!(wait_for(|| {
            pulled.extend(session.read_new(&mut cursor));
            pulled.len() >= 160
        }));
        // Reads accumulate whole poll batches of the mock's 160-sample chunks.
        assert_eq!(pulled.len() % 160, 0);

        session.stop();
    }

    #[test]
    fn test_stop_resets_ring() {
        let source = MockAudioSource::new().with_samples(vec![0.5; 160]);
        let mut session = CaptureSession::new(source, &test_config(), null_logger());

        session.start().unwrap();
        assert!(wait_for(|| !session.read_all().is_empty()));
        session.stop();

        assert!(session.read_all().is_empty());
        assert!(!session.is_recording());
    }

    #[test]
    fn test_stop_without_start_is_noop() {
        let source = MockAudioSource::new();
        let mut session = CaptureSession::new(source, &test_config(), null_logger());
        session.stop();
        assert!(!session.is_recording());
    }

    #[test]
    fn test_dispose_is_idempotent_and_inert() {
        let source = MockAudioSource::new().with_samples(vec![0.5; 160]);
        let mut session = CaptureSession::new(source, &test_config(), null_logger());
        session.start().unwrap();

        session.dispose();
        session.dispose();

        assert!(!session.is_recording());
        assert!(session.start().is_err());
        let mut cursor = session.cursor();
        assert!(session.read_new(&mut cursor).is_empty());
        assert!(session.read_all().is_empty());
        session.stop(); // still a no-op, never panics
    }

    #[test]
    fn test_cancelled_start_tears_down() {
        let source = MockAudioSource::new();
        let mut session = CaptureSession::new(source, &test_config(), null_logger());

        let cancel = CancelFlag::new();
        cancel.cancel();

        match session.start_with_cancel(&cancel) {
            Err(VoiceKitError::Cancelled) => {}
            other => panic!("expected Cancelled, got {:?}", other.err()),
        }
        assert!(!session.is_recording());
    }

    #[test]
    fn test_poll_error_is_logged_and_ends_ticker() {
        let sink = Arc::new(MemorySink::new());
        let logger: Logger = sink.clone();
        let source = MockAudioSource::new().with_read_failure();
        let mut session = CaptureSession::new(source, &test_config(), logger);

        session.start().unwrap();
        assert!(wait_for(|| !session.is_recording()));
        assert!(sink.contains(Severity::Error, "capture poll failed"));
    }

    #[test]
    fn test_finite_source_stops_producing_frames() {
        let source = ScriptedAudioSource::new(vec![0.5; 320], 160);
        let mut session = CaptureSession::new(source, &test_config(), null_logger());
        let rx = session.subscribe();

        session.start().unwrap();
        let mut total = 0;
        while let Ok(frame) = rx.recv_timeout(Duration::from_millis(200)) {
            total += frame.samples.len();
        }
        session.stop();

        assert_eq!(total, 320);
    }

    #[test]
    fn test_restart_after_stop() {
        let source = MockAudioSource::new().with_samples(vec![0.5; 160]);
        let mut session = CaptureSession::new(source, &test_config(), null_logger());

        session.start().unwrap();
        session.stop();
        assert!(session.start().is_ok());
        assert!(session.is_recording());
        session.stop();
    }
}
