//! Fixed-capacity circular sample store with independent read cursors.
//!
//! The writer advances a single absolute position; each reader owns a
//! [`ReadCursor`] tracking how far it has consumed. A read returns only
//! samples written since that cursor's last read, splitting wrap-around
//! ranges into tail and head segments concatenated in temporal order.
//! Readers that fall more than a full buffer behind lose the overwritten
//! prefix and resume from the oldest retained sample.

/// Independent read position into a [`RingBuffer`].
///
/// Positions are absolute sample counts, so a cursor stays valid across
/// buffer wrap-around. Create cursors through [`RingBuffer::cursor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadCursor {
    position: u64,
}

impl ReadCursor {
    /// Absolute number of samples this cursor has consumed.
    pub fn position(&self) -> u64 {
        self.position
    }
}

/// Fixed-capacity circular store of f32 PCM samples.
pub struct RingBuffer {
    storage: Vec<f32>,
    written: u64,
}

impl RingBuffer {
    /// Creates a ring holding at most `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        Self {
            storage: vec![0.0; capacity.max(1)],
            written: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Total samples ever written, including overwritten ones.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Number of samples currently retained.
    pub fn len(&self) -> usize {
        self.written.min(self.capacity() as u64) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.written == 0
    }

    /// Appends samples, overwriting the oldest data once full.
    pub fn push(&mut self, samples: &[f32]) {
        if samples.is_empty() {
            return;
        }

        let capacity = self.capacity();

        // A write larger than the buffer only keeps its trailing window;
        // the skipped prefix still counts as written.
        let skip = samples.len().saturating_sub(capacity);
        self.written += skip as u64;
        let samples = &samples[skip..];

        let mut offset = 0;
        while offset < samples.len() {
            let idx = (self.written % capacity as u64) as usize;
            let n = (capacity - idx).min(samples.len() - offset);
            self.storage[idx..idx + n].copy_from_slice(&samples[offset..offset + n]);
            self.written += n as u64;
            offset += n;
        }
    }

    /// Creates a cursor positioned at the current write position.
    ///
    /// The cursor will only observe samples pushed after its creation.
    pub fn cursor(&self) -> ReadCursor {
        ReadCursor {
            position: self.written,
        }
    }

    /// Returns the samples written since `cursor` last read, advancing it.
    ///
    /// Returns an empty vector when nothing new exists. A cursor that has
    /// been lapped is clamped to the oldest retained sample.
    pub fn read_new(&self, cursor: &mut ReadCursor) -> Vec<f32> {
        // A cursor from before a reset can sit past the write position.
        if cursor.position > self.written {
            cursor.position = self.written;
            return Vec::new();
        }

        let oldest = self.written.saturating_sub(self.capacity() as u64);
        let start = cursor.position.max(oldest);
        cursor.position = self.written;

        self.copy_range(start, self.written)
    }

    /// Returns the entire retained buffer contents in temporal order,
    /// independent of any cursor.
    pub fn read_all(&self) -> Vec<f32> {
        let oldest = self.written.saturating_sub(self.capacity() as u64);
        self.copy_range(oldest, self.written)
    }

    /// Discards all contents and rewinds the write position.
    ///
    /// Existing cursors clamp to the new position on their next read.
    pub fn reset(&mut self) {
        self.written = 0;
    }

    /// Copies the absolute range `[start, end)` out of the circular storage,
    /// splitting a wrapped range into tail then head.
    fn copy_range(&self, start: u64, end: u64) -> Vec<f32> {
        let count = (end - start) as usize;
        if count == 0 {
            return Vec::new();
        }

        let capacity = self.capacity();
        let idx = (start % capacity as u64) as usize;
        let tail = (capacity - idx).min(count);

        let mut out = Vec::with_capacity(count);
        out.extend_from_slice(&self.storage[idx..idx + tail]);
        out.extend_from_slice(&self.storage[..count - tail]);
        out
    }
}
