//! Streaming band-power pipeline
//!
//! Pulls multi-channel samples from a source into a sliding window and, on a
//! fixed cadence, turns the window into a cross-channel band-power snapshot
//! that is broadcast to subscribers.

pub mod acquisition;
pub mod buffer;
pub mod clock;
pub mod emitter;
pub mod error;

// Re-export commonly used types
pub use acquisition::*;
pub use buffer::*;
pub use clock::*;
pub use emitter::*;
pub use error::*;
