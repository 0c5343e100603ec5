//! Audio capture: source abstraction, circular buffering, capture session.

pub mod capture;
#[cfg(feature = "cpal-audio")]
pub mod device;
pub mod ring;
pub mod source;
pub mod wav;

pub use capture::{AudioFrame, CaptureSession};
pub use ring::{ReadCursor, RingBuffer};
pub use source::{AudioSource, MockAudioSource};
