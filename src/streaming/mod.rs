//! Streaming (online) speech recognition.
//!
//! Unlike the offline path there is no pool: streaming is 1:1, one native
//! stream per loaded engine, decoded incrementally as audio arrives.

pub mod session;

pub use session::{StreamingEngine, StreamingEvent, StreamingSession};
