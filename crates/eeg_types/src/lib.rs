//! Shared types for the band-power streaming system
//!
//! This crate contains the data model used throughout the workspace: samples as
//! they arrive from a source, the brain-wave band catalogue, band-power snapshots
//! and the message broadcast to subscribers.

pub mod band;
pub mod comms;
pub mod data;

// Re-export commonly used types
pub use band::*;
pub use comms::*;
pub use data::*;
