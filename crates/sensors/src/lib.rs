pub mod mock_eeg;
pub mod tcp;
pub mod types;

// Re-export the main types that users need
pub use types::{
    current_timestamp_secs, DriverError, PullOutcome, SampleSource, SourceResolver,
};
