use std::thread;
use std::time::{Duration, Instant};

use eeg_types::{Sample, SensorError};
use log::{debug, info};

use super::mock_data_generator::EegGenerator;
use crate::types::{
    current_timestamp_secs, DriverError, PullOutcome, SampleSource, SourceResolver,
};

/// Signal type advertised by the mock source.
pub const MOCK_SIGNAL_TYPE: &str = "EEG";

/// Settings for the synthetic source.
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub channels: usize,
    pub sample_rate: f64,
    /// Report the stream as lost after this much signal time.
    pub duration: Option<Duration>,
    /// Pace samples at the sample rate. When false every pull returns immediately.
    pub realtime: bool,
    pub seed: Option<u64>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            channels: 4,
            sample_rate: 256.0,
            duration: None,
            realtime: true,
            seed: None,
        }
    }
}

/// A source that synthesises EEG-like samples instead of reading hardware.
pub struct MockSource {
    config: MockConfig,
    generator: EegGenerator,
    base_timestamp: f64,
    started: Instant,
    sample_count: u64,
}

impl MockSource {
    pub fn new(config: MockConfig) -> Result<Self, DriverError> {
        if config.channels == 0 {
            return Err(DriverError::ConfigurationError(
                "At least one channel must be configured".to_string(),
            ));
        }
        if !config.sample_rate.is_finite() || config.sample_rate <= 0.0 {
            return Err(DriverError::ConfigurationError(format!(
                "Invalid sample rate: {}",
                config.sample_rate
            )));
        }

        let generator = match config.seed {
            Some(seed) => EegGenerator::with_seed(config.sample_rate, config.channels, seed)?,
            None => EegGenerator::new(config.sample_rate, config.channels)?,
        };

        info!("MockSource created with config: {:?}", config);

        Ok(Self {
            base_timestamp: current_timestamp_secs()?,
            started: Instant::now(),
            sample_count: 0,
            generator,
            config,
        })
    }

    fn signal_time(&self, sample_num: u64) -> Duration {
        Duration::from_secs_f64(sample_num as f64 / self.config.sample_rate)
    }
}

impl SampleSource for MockSource {
    fn channel_count(&self) -> usize {
        self.config.channels
    }

    fn sample_rate(&self) -> f64 {
        self.config.sample_rate
    }

    fn pull_sample(&mut self, timeout: Duration) -> Result<PullOutcome, SensorError> {
        let offset = self.signal_time(self.sample_count);

        if let Some(duration) = self.config.duration {
            if offset >= duration {
                debug!("MockSource reached its configured duration of {:?}", duration);
                return Ok(PullOutcome::Lost);
            }
        }

        if self.config.realtime {
            let due = self.started + offset;
            let now = Instant::now();
            if due > now {
                let wait = due - now;
                if wait > timeout {
                    thread::sleep(timeout);
                    return Ok(PullOutcome::Timeout);
                }
                thread::sleep(wait);
            }
        }

        let channels = self.generator.next_sample();
        let timestamp = self.base_timestamp + offset.as_secs_f64();
        self.sample_count += 1;

        Ok(PullOutcome::Sample(Sample::new(timestamp, channels)))
    }

    fn shutdown(&mut self) -> Result<(), DriverError> {
        info!("MockSource shutdown after {} samples", self.sample_count);
        Ok(())
    }
}

/// Resolves the mock source for the `"EEG"` signal type.
#[derive(Debug, Clone, Default)]
pub struct MockResolver {
    pub config: MockConfig,
}

impl MockResolver {
    pub fn new(config: MockConfig) -> Self {
        Self { config }
    }
}

impl SourceResolver for MockResolver {
    fn resolve(&self, signal_type: &str) -> Result<Box<dyn SampleSource>, DriverError> {
        if !signal_type.eq_ignore_ascii_case(MOCK_SIGNAL_TYPE) {
            return Err(DriverError::HardwareNotFound(format!(
                "No mock source advertises signal type '{}'",
                signal_type
            )));
        }
        Ok(Box::new(MockSource::new(self.config.clone())?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> MockConfig {
        MockConfig {
            channels: 4,
            sample_rate: 256.0,
            duration: Some(Duration::from_secs(1)),
            realtime: false,
            seed: Some(1),
        }
    }

    #[test]
    fn test_mock_source_reports_lost_after_duration() {
        let mut source = MockSource::new(fast_config()).unwrap();
        let mut samples = 0;
        loop {
            match source.pull_sample(Duration::from_millis(10)).unwrap() {
                PullOutcome::Sample(sample) => {
                    assert_eq!(sample.channel_count(), 4);
                    samples += 1;
                }
                PullOutcome::Timeout => panic!("non-realtime source never times out"),
                PullOutcome::Lost => break,
            }
        }
        assert_eq!(samples, 256);
    }

    #[test]
    fn test_mock_source_timestamps_advance_by_sample_period() {
        let mut source = MockSource::new(fast_config()).unwrap();
        let first = match source.pull_sample(Duration::from_millis(10)).unwrap() {
            PullOutcome::Sample(s) => s.timestamp,
            other => panic!("unexpected {:?}", other),
        };
        let second = match source.pull_sample(Duration::from_millis(10)).unwrap() {
            PullOutcome::Sample(s) => s.timestamp,
            other => panic!("unexpected {:?}", other),
        };
        // Epoch-scale timestamps leave roughly 1e-7 s of f64 resolution.
        assert!((second - first - 1.0 / 256.0).abs() < 1e-6);
    }

    #[test]
    fn test_realtime_source_times_out_when_wait_exceeds_bound() {
        let mut source = MockSource::new(MockConfig {
            sample_rate: 1.0,
            duration: None,
            realtime: true,
            ..fast_config()
        })
        .unwrap();
        // The first sample is due immediately, the second one a second later.
        assert!(matches!(
            source.pull_sample(Duration::from_millis(5)).unwrap(),
            PullOutcome::Sample(_)
        ));
        assert_eq!(
            source.pull_sample(Duration::from_millis(5)).unwrap(),
            PullOutcome::Timeout
        );
    }

    #[test]
    fn test_resolver_rejects_unknown_signal_type() {
        let resolver = MockResolver::new(fast_config());
        assert!(resolver.resolve("EEG").is_ok());
        assert!(matches!(
            resolver.resolve("Markers"),
            Err(DriverError::HardwareNotFound(_))
        ));
    }

    #[test]
    fn test_zero_channels_rejected() {
        let config = MockConfig {
            channels: 0,
            ..fast_config()
        };
        assert!(matches!(
            MockSource::new(config),
            Err(DriverError::ConfigurationError(_))
        ));
    }
}
