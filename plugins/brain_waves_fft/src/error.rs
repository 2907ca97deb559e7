use thiserror::Error;

/// Errors raised by spectral estimation and aggregation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpectralError {
    #[error("window length must be at least 2 samples, got {0}")]
    InvalidWindow(usize),

    #[error("sample rate must be positive and finite, got {0}")]
    InvalidSampleRate(f64),

    #[error("channel count must be positive")]
    NoChannels,

    #[error("expected {expected} samples per channel, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("expected {expected} channels, sample {index} has {actual}")]
    ChannelMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },
}
