use serde::{Deserialize, Serialize};

/// Represents errors that can occur while pulling samples from a signal source.
///
/// These never reach subscribers; the acquisition loop maps them onto a
/// termination reason and logs them for the operator.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum SensorError {
    /// A hardware-related fault.
    #[error("Sensor hardware fault: {0}")]
    HardwareFault(String),
    /// The source stopped delivering samples.
    #[error("Sensor disconnected")]
    Disconnected,
    /// The source delivered something that is not a sample vector.
    #[error("Malformed sample: {0}")]
    MalformedSample(String),
}

/// One acquisition tick: a reading per channel plus the source's timestamp.
///
/// Channel identity is positional and fixed for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Acquisition timestamp as reported by the source, in seconds.
    pub timestamp: f64,
    /// One scalar per channel.
    pub channels: Vec<f64>,
}

impl Sample {
    pub fn new(timestamp: f64, channels: Vec<f64>) -> Self {
        Self {
            timestamp,
            channels,
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}
