//! Common types and traits for sample sources

use std::time::Duration;

use eeg_types::{Sample, SensorError};
use thiserror::Error;

/// Errors raised while discovering or opening a source.
///
/// Anything that fails here happens before streaming begins and is fatal to
/// the session.
#[derive(Error, Debug, Clone)]
pub enum DriverError {
    /// A sensor-specific error.
    #[error("Sensor error: {0}")]
    SensorError(#[from] SensorError),
    /// Invalid configuration
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    /// I/O error
    #[error("I/O error: {0}")]
    IoError(String),
    /// No source of the requested signal type could be found
    #[error("Hardware not found: {0}")]
    HardwareNotFound(String),
    /// Generic error
    #[error("Error: {0}")]
    Other(String),
}

impl From<std::io::Error> for DriverError {
    fn from(err: std::io::Error) -> Self {
        DriverError::IoError(err.to_string())
    }
}

/// The result of a single bounded-wait pull.
#[derive(Debug, Clone, PartialEq)]
pub enum PullOutcome {
    /// A sample arrived within the wait.
    Sample(Sample),
    /// Nothing arrived within the wait. Not an error.
    Timeout,
    /// The source has gone away and will not deliver again.
    Lost,
}

/// Trait that all sample sources must implement
pub trait SampleSource: Send + 'static {
    /// Number of channels in every sample this source delivers.
    fn channel_count(&self) -> usize;

    /// Fixed sampling rate in Hz.
    fn sample_rate(&self) -> f64;

    /// Pull the next sample, blocking for at most `timeout`.
    fn pull_sample(&mut self, timeout: Duration) -> Result<PullOutcome, SensorError>;

    /// Release any resources held by the source.
    fn shutdown(&mut self) -> Result<(), DriverError> {
        Ok(())
    }
}

/// Discovers and opens a source advertising the given signal type (e.g. `"EEG"`).
pub trait SourceResolver {
    fn resolve(&self, signal_type: &str) -> Result<Box<dyn SampleSource>, DriverError>;
}

/// Seconds since the Unix epoch for the current instant.
pub fn current_timestamp_secs() -> Result<f64, DriverError> {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .map_err(|e| DriverError::Other(format!("Failed to get timestamp: {}", e)))
}
