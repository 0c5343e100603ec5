//! Bounded pool of opaque engine handles.
//!
//! Each handle wraps a native inference context that is not safe for
//! concurrent calls. Checkout is blocking and mutually exclusive: callers
//! wait on a condvar until a handle is idle, and a returned guard puts the
//! handle back even if recognition panics. Shrinking never interrupts a
//! handle mid-call; excess handles are disposed once idle.

use crate::cancel::CancelFlag;
use crate::engine::{EngineFactory, RecognitionResult, SpeechEngine};
use crate::logging::{Logger, Severity, stderr_logger};
use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

struct PoolInner<F: EngineFactory> {
    factory: Option<F>,
    idle: VecDeque<F::Engine>,
    /// Handles currently existing: idle plus checked out.
    live: usize,
    /// Desired pool size; zero means unloaded.
    target: usize,
}

/// Pool of native engine handles with mutually-exclusive checkout.
pub struct EnginePool<F: EngineFactory> {
    inner: Mutex<PoolInner<F>>,
    available: Condvar,
    logger: Logger,
}

impl<F: EngineFactory> EnginePool<F> {
    pub fn new() -> Self {
        Self::with_logger(stderr_logger())
    }

    pub fn with_logger(logger: Logger) -> Self {
        Self {
            inner: Mutex::new(PoolInner {
                factory: None,
                idle: VecDeque::new(),
                live: 0,
                target: 0,
            }),
            available: Condvar::new(),
            logger,
        }
    }

    /// Builds `pool_size` handles through `factory`.
    ///
    /// Per-handle construction failures are logged and skipped, so the pool
    /// may load with fewer usable handles than requested. Returns false when
    /// zero handles succeed; the pool then reports not-loaded.
    pub fn load(&self, factory: F, pool_size: usize) -> bool {
        self.load_with_cancel(factory, pool_size, &CancelFlag::new())
    }

    /// Like [`load`](Self::load), but stops between handle builds when
    /// `cancel` fires. Already-built handles are torn down and the pool is
    /// left unloaded; cancellation is not logged as an error.
    pub fn load_with_cancel(&self, factory: F, pool_size: usize, cancel: &CancelFlag) -> bool {
        let pool_size = pool_size.max(1);
        self.unload();

        self.logger.emit(
            Severity::Info,
            &format!(
                "engine pool loading: {} (pool={})",
                factory.profile(),
                pool_size
            ),
        );

        let mut handles = VecDeque::new();
        for index in 0..pool_size {
            if cancel.is_cancelled() {
                drop(handles);
                self.logger.emit(Severity::Debug, "engine pool load cancelled");
                return false;
            }

            match factory.build() {
                Ok(engine) => handles.push_back(engine),
                Err(e) => self.logger.emit(
                    Severity::Error,
                    &format!(
                        "engine pool: handle {} for '{}' failed: {}",
                        index,
                        factory.profile(),
                        e
                    ),
                ),
            }
        }

        let count = handles.len();
        if count == 0 {
            self.logger.emit(
                Severity::Error,
                &format!(
                    "engine pool: no usable handles for '{}', pool not loaded",
                    factory.profile()
                ),
            );
            return false;
        }

        let profile = factory.profile().to_string();
        if let Some(mut inner) = self.lock_inner() {
            inner.factory = Some(factory);
            inner.idle = handles;
            inner.live = count;
            inner.target = pool_size;
        } else {
            return false;
        }
        self.available.notify_all();

        self.logger.emit(
            Severity::Info,
            &format!("engine pool loaded: {} (handles={})", profile, count),
        );
        true
    }

    /// True when at least one usable handle exists.
    pub fn is_loaded(&self) -> bool {
        self.lock_inner()
            .map(|inner| inner.target > 0 && inner.live > 0)
            .unwrap_or(false)
    }

    /// Desired pool size (zero when unloaded).
    pub fn pool_size(&self) -> usize {
        self.lock_inner().map(|inner| inner.target).unwrap_or(0)
    }

    /// Handles currently existing, idle plus checked out.
    pub fn handle_count(&self) -> usize {
        self.lock_inner().map(|inner| inner.live).unwrap_or(0)
    }

    /// Recognizes a PCM span on the first idle handle.
    ///
    /// Blocks until a handle frees up under contention. Returns `None`
    /// without blocking when the pool is not loaded, when the span is empty,
    /// or when the engine yields an error or empty text; failures are logged,
    /// never propagated.
    pub fn recognize(&self, samples: &[f32], sample_rate: u32) -> Option<RecognitionResult> {
        if samples.is_empty() {
            self.logger
                .emit(Severity::Warning, "engine pool: samples are empty");
            return None;
        }

        let mut checkout = self.checkout()?;
        let outcome = match checkout.engine.as_mut() {
            Some(engine) => engine.recognize(samples, sample_rate),
            None => return None,
        };
        drop(checkout);

        match outcome {
            Ok(result) if result.is_valid() => {
                self.logger.emit(
                    Severity::Debug,
                    &format!("recognized: \"{}\"", truncate(&result.text, 80)),
                );
                Some(result)
            }
            Ok(_) => None,
            Err(e) => {
                self.logger
                    .emit(Severity::Error, &format!("recognition failed: {}", e));
                None
            }
        }
    }

    /// Grows or shrinks the pool at runtime.
    ///
    /// Growth builds new handles through the retained factory. Shrinking
    /// disposes idle handles immediately and busy handles as they return;
    /// a handle is never interrupted mid-call.
    pub fn resize(&self, new_size: usize) {
        let new_size = new_size.max(1);

        let (grow_by, factory) = {
            let Some(mut inner) = self.lock_inner() else {
                return;
            };
            if inner.target == 0 {
                self.logger
                    .emit(Severity::Error, "engine pool resize: not loaded");
                return;
            }
            if new_size == inner.target {
                return;
            }

            if new_size < inner.target {
                inner.target = new_size;
                while inner.live > inner.target {
                    match inner.idle.pop_front() {
                        Some(engine) => {
                            drop(engine);
                            inner.live -= 1;
                        }
                        // Remaining excess handles are busy; they are
                        // disposed on return.
                        None => break,
                    }
                }
                self.logger.emit(
                    Severity::Info,
                    &format!("engine pool resized to {}", new_size),
                );
                return;
            }

            let grow_by = new_size - inner.target;
            inner.target = new_size;
            (grow_by, inner.factory.take())
        };

        let Some(factory) = factory else {
            self.logger
                .emit(Severity::Error, "engine pool resize: factory unavailable");
            return;
        };

        let mut built = Vec::new();
        for _ in 0..grow_by {
            match factory.build() {
                Ok(engine) => built.push(engine),
                Err(e) => self.logger.emit(
                    Severity::Error,
                    &format!("engine pool grow: handle creation failed: {}", e),
                ),
            }
        }

        if let Some(mut inner) = self.lock_inner() {
            inner.factory = Some(factory);
            for engine in built {
                if inner.live < inner.target {
                    inner.idle.push_back(engine);
                    inner.live += 1;
                }
            }
        }
        self.available.notify_all();

        self.logger.emit(
            Severity::Info,
            &format!("engine pool resized to {}", new_size),
        );
    }

    /// Disposes all idle handles and marks the pool unloaded.
    ///
    /// Checked-out handles finish their call and are disposed on return.
    /// Safe to call multiple times.
    pub fn unload(&self) {
        let drained = {
            let Some(mut inner) = self.lock_inner() else {
                return;
            };
            if inner.target == 0 && inner.live == 0 {
                return;
            }

            inner.factory = None;
            inner.target = 0;
            let drained: Vec<F::Engine> = inner.idle.drain(..).collect();
            inner.live -= drained.len();
            drained
        };
        self.available.notify_all();
        drop(drained);

        self.logger.emit(Severity::Info, "engine pool unloaded");
    }

    /// Alias for [`unload`](Self::unload); idempotent.
    pub fn dispose(&self) {
        self.unload();
    }

    fn checkout(&self) -> Option<CheckedOut<'_, F>> {
        let mut inner = self.lock_inner()?;
        loop {
            if inner.target == 0 || inner.live == 0 {
                self.logger
                    .emit(Severity::Error, "engine pool: not loaded");
                return None;
            }
            if let Some(engine) = inner.idle.pop_front() {
                return Some(CheckedOut {
                    pool: self,
                    engine: Some(engine),
                });
            }
            match self.available.wait(inner) {
                Ok(guard) => inner = guard,
                Err(_) => {
                    self.logger
                        .emit(Severity::Error, "engine pool state poisoned");
                    return None;
                }
            }
        }
    }

    fn checkin(&self, engine: F::Engine) {
        if let Ok(mut inner) = self.inner.lock() {
            if inner.live > inner.target {
                inner.live -= 1;
                drop(engine);
                self.logger
                    .emit(Severity::Debug, "disposed excess engine handle");
            } else {
                inner.idle.push_back(engine);
            }
        }
        self.available.notify_one();
    }

    fn lock_inner(&self) -> Option<MutexGuard<'_, PoolInner<F>>> {
        match self.inner.lock() {
            Ok(guard) => Some(guard),
            Err(_) => {
                self.logger
                    .emit(Severity::Error, "engine pool state poisoned");
                None
            }
        }
    }
}

impl<F: EngineFactory + 'static> EnginePool<F> {
    /// Loads the pool on a blocking worker thread.
    ///
    /// Cancellation tears down partially-built handles, see
    /// [`load_with_cancel`](Self::load_with_cancel).
    pub async fn load_async(
        self: &Arc<Self>,
        factory: F,
        pool_size: usize,
        cancel: CancelFlag,
    ) -> bool {
        let pool = Arc::clone(self);
        tokio::task::spawn_blocking(move || pool.load_with_cancel(factory, pool_size, &cancel))
            .await
            .unwrap_or(false)
    }

    /// Runs [`recognize`](Self::recognize) on a blocking worker thread.
    pub async fn recognize_async(
        self: &Arc<Self>,
        samples: Vec<f32>,
        sample_rate: u32,
    ) -> Option<RecognitionResult> {
        let pool = Arc::clone(self);
        tokio::task::spawn_blocking(move || pool.recognize(&samples, sample_rate))
            .await
            .ok()
            .flatten()
    }
}

impl<F: EngineFactory> Default for EnginePool<F> {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns its handle to the pool on drop, so a panic inside a native call
/// cannot leak the handle outside the checkout discipline.
struct CheckedOut<'a, F: EngineFactory> {
    pool: &'a EnginePool<F>,
    engine: Option<F::Engine>,
}

impl<F: EngineFactory> Drop for CheckedOut<'_, F> {
    fn drop(&mut self) {
        if let Some(engine) = self.engine.take() {
            self.pool.checkin(engine);
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut)
}
