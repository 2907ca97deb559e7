//! Error types for the acquisition pipeline

use brain_waves_fft_plugin::SpectralError;
use eeg_types::SensorError;
use sensors::DriverError;
use thiserror::Error;

/// Pipeline-specific error types
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The source could not be discovered or opened. Fatal before streaming starts.
    #[error("Failed to open sample source: {0}")]
    Startup(#[from] DriverError),

    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("Sample has {actual} channels, session expects {expected}")]
    ChannelMismatch { expected: usize, actual: usize },

    #[error("Sensor error: {0}")]
    Sensor(#[from] SensorError),

    #[error("Spectral analysis error: {0}")]
    Spectral(#[from] SpectralError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;
