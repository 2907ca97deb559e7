use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context};
use pipeline::AcquisitionConfig;
use sensors::mock_eeg::{MockConfig, MockResolver};
use sensors::tcp::TcpResolver;
use sensors::SourceResolver;
use serde::{Deserialize, Serialize};

/// Where samples come from.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceConfig {
    /// Synthetic multi-band EEG paced in real time.
    Mock {
        #[serde(default = "default_mock_channels")]
        channels: usize,
        /// Report the stream as lost after this many seconds. Unbounded when absent.
        #[serde(default)]
        duration_secs: Option<f64>,
    },
    /// Newline-delimited JSON samples read from a TCP peer.
    Tcp {
        addr: String,
        #[serde(default = "default_connect_timeout_secs")]
        connect_timeout_secs: f64,
    },
}

fn default_mock_channels() -> usize {
    4
}

fn default_connect_timeout_secs() -> f64 {
    5.0
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::Mock {
            channels: default_mock_channels(),
            duration_secs: None,
        }
    }
}

/// Configuration for the daemon
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DaemonConfig {
    /// Address the WebSocket server binds to
    pub listen_addr: String,
    /// Signal type requested from the source resolver
    pub signal_type: String,
    pub sample_rate_hz: f64,
    /// Sliding window length in samples
    pub window_size: usize,
    pub emission_interval_secs: f64,
    pub pull_timeout_secs: f64,
    /// Consecutive empty pulls tolerated before the stream counts as lost.
    /// Absent means retry forever.
    pub max_consecutive_timeouts: Option<u32>,
    pub source: SourceConfig,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:6789".to_string(),
            signal_type: "EEG".to_string(),
            sample_rate_hz: 256.0,
            window_size: 256,
            emission_interval_secs: 1.0,
            pull_timeout_secs: 1.0,
            max_consecutive_timeouts: None,
            source: SourceConfig::default(),
        }
    }
}

fn positive(name: &str, value: f64) -> anyhow::Result<()> {
    if !value.is_finite() || value <= 0.0 {
        bail!("{} must be a positive number, got {}", name, value);
    }
    Ok(())
}

/// A positive number of seconds that fits in a `Duration`.
fn seconds(name: &str, value: f64) -> anyhow::Result<Duration> {
    positive(name, value)?;
    Duration::try_from_secs_f64(value)
        .with_context(|| format!("{} is out of range, got {}", name, value))
}

impl DaemonConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.window_size < 2 {
            bail!("window_size must be at least 2, got {}", self.window_size);
        }
        positive("sample_rate_hz", self.sample_rate_hz)?;
        seconds("emission_interval_secs", self.emission_interval_secs)?;
        seconds("pull_timeout_secs", self.pull_timeout_secs)?;
        match &self.source {
            SourceConfig::Mock {
                channels,
                duration_secs,
            } => {
                if *channels == 0 {
                    bail!("mock source needs at least one channel");
                }
                if let Some(secs) = duration_secs {
                    seconds("duration_secs", *secs)?;
                }
            }
            SourceConfig::Tcp {
                addr,
                connect_timeout_secs,
            } => {
                if addr.trim().is_empty() {
                    bail!("tcp source needs an address");
                }
                seconds("connect_timeout_secs", *connect_timeout_secs)?;
            }
        }
        Ok(())
    }

    /// Timing constants handed to the acquisition loop.
    pub fn acquisition_config(&self) -> anyhow::Result<AcquisitionConfig> {
        Ok(AcquisitionConfig {
            window_size: self.window_size,
            emission_interval: seconds("emission_interval_secs", self.emission_interval_secs)?,
            pull_timeout: seconds("pull_timeout_secs", self.pull_timeout_secs)?,
            max_consecutive_timeouts: self.max_consecutive_timeouts,
        })
    }

    pub fn resolver(&self) -> anyhow::Result<Box<dyn SourceResolver + Send>> {
        let resolver: Box<dyn SourceResolver + Send> = match &self.source {
            SourceConfig::Mock {
                channels,
                duration_secs,
            } => Box::new(MockResolver::new(MockConfig {
                channels: *channels,
                sample_rate: self.sample_rate_hz,
                duration: duration_secs
                    .map(|secs| seconds("duration_secs", secs))
                    .transpose()?,
                ..MockConfig::default()
            })),
            SourceConfig::Tcp {
                addr,
                connect_timeout_secs,
            } => Box::new(TcpResolver {
                addr: addr.clone(),
                sample_rate: self.sample_rate_hz,
                connect_timeout: seconds("connect_timeout_secs", *connect_timeout_secs)?,
            }),
        };
        Ok(resolver)
    }
}

/// Loads the daemon configuration from a JSON file, or the defaults when no
/// path is given. Missing keys fall back to their defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<DaemonConfig> {
    let Some(path) = path else {
        tracing::info!("No configuration file given, using defaults");
        return Ok(DaemonConfig::default());
    };
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Could not read configuration file at '{}'", path.display()))?;
    let config: DaemonConfig = serde_json::from_str(&contents)
        .with_context(|| format!("Could not parse configuration file at '{}'", path.display()))?;
    tracing::info!("Loaded configuration from {}", path.display());
    Ok(config)
}
