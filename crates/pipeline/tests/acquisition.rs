//! End-to-end behaviour of the acquisition loop against scripted sources.

use std::f64::consts::PI;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use eeg_types::{BandPowerSnapshot, BrainWave, Sample, SensorError, SnapshotMessage};
use pipeline::{
    AcquisitionConfig, AcquisitionLoop, Broadcaster, LoopState, ManualClock, PipelineError,
    SnapshotEmitter, TerminationReason,
};
use sensors::mock_eeg::{MockConfig, MockResolver};
use sensors::{DriverError, PullOutcome, SampleSource, SourceResolver};

#[derive(Default)]
struct Recorder(Mutex<Vec<String>>);

impl Recorder {
    fn messages(&self) -> Vec<SnapshotMessage> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .map(|text| serde_json::from_str(text).unwrap())
            .collect()
    }
}

impl Broadcaster for Recorder {
    fn broadcast(&self, payload: String) -> usize {
        self.0.lock().unwrap().push(payload);
        1
    }
}

/// A 10 Hz tone on every channel that moves the shared clock forward by
/// `tick` per delivered sample and reports loss after `total` samples.
struct ClockedTone {
    clock: ManualClock,
    tick: Duration,
    sent: usize,
    total: usize,
    channels: usize,
}

impl SampleSource for ClockedTone {
    fn channel_count(&self) -> usize {
        self.channels
    }

    fn sample_rate(&self) -> f64 {
        256.0
    }

    fn pull_sample(&mut self, _timeout: Duration) -> Result<PullOutcome, SensorError> {
        if self.sent == self.total {
            return Ok(PullOutcome::Lost);
        }
        let t = self.sent as f64 / 256.0;
        let value = (2.0 * PI * 10.0 * t).sin();
        self.sent += 1;
        self.clock.advance(self.tick);
        Ok(PullOutcome::Sample(Sample::new(t, vec![value; self.channels])))
    }
}

fn assert_close(got: &BandPowerSnapshot, expected: &BandPowerSnapshot) {
    for wave in BrainWave::ALL {
        let (got, expected) = (got.get(wave), expected.get(wave));
        assert!(
            (got - expected).abs() <= 1e-9 * expected.abs().max(f64::MIN_POSITIVE),
            "{}: {} vs {}",
            wave,
            got,
            expected
        );
    }
}

fn tone_loop(
    tick: Duration,
    total: usize,
) -> (AcquisitionLoop<Arc<Recorder>, ManualClock>, Arc<Recorder>) {
    let clock = ManualClock::new(1_700_000_000.0);
    let source = ClockedTone {
        clock: clock.clone(),
        tick,
        sent: 0,
        total,
        channels: 4,
    };
    let recorder = Arc::new(Recorder::default());
    let acquisition = AcquisitionLoop::with_source(
        Box::new(source),
        AcquisitionConfig {
            window_size: 256,
            emission_interval: Duration::from_secs(1),
            pull_timeout: Duration::from_secs(1),
            max_consecutive_timeouts: None,
        },
        SnapshotEmitter::new(recorder.clone()),
        clock,
    )
    .unwrap();
    (acquisition, recorder)
}

#[test]
fn test_no_emission_before_window_is_full() {
    // 10 ms per sample: a full second passes after 100 samples, the window fills at 256.
    let (mut acquisition, recorder) = tone_loop(Duration::from_millis(10), 1000);
    for _ in 0..255 {
        acquisition.step().unwrap();
    }
    assert!(!acquisition.buffer().is_full());
    assert!(recorder.messages().is_empty());

    acquisition.step().unwrap();
    assert_eq!(recorder.messages().len(), 1);

    // Next emission waits a full interval after the first: 100 more samples.
    for _ in 0..99 {
        acquisition.step().unwrap();
    }
    assert_eq!(recorder.messages().len(), 1);
    acquisition.step().unwrap();
    assert_eq!(recorder.messages().len(), 2);
}

#[test]
fn test_ten_hz_window_emits_alpha_dominant_snapshot() {
    let (acquisition, recorder) = tone_loop(Duration::from_nanos(3_906_250), 256);
    let report = acquisition.run();

    let messages = recorder.messages();
    assert_eq!(messages.len(), 1);
    let data = messages[0].data;
    for wave in [BrainWave::Delta, BrainWave::Theta, BrainWave::Beta, BrainWave::Gamma] {
        assert!(data.alpha > data.get(wave), "alpha must dominate {}", wave);
    }
    assert_eq!(report.snapshots_emitted, 1);
    // The broadcast payload went through JSON, the averages did not.
    assert_close(&report.final_averages.unwrap(), &data);
}

#[test]
fn test_stream_loss_reports_averages_of_emitted_snapshots() {
    // 1/256 s per sample: emissions at samples 256, 512 and 768; loss after 1000.
    let (acquisition, recorder) = tone_loop(Duration::from_nanos(3_906_250), 1000);
    let report = acquisition.run();

    assert_eq!(report.end, LoopState::Terminated(TerminationReason::StreamLost));
    assert_eq!(report.samples_admitted, 1000);

    let messages = recorder.messages();
    assert_eq!(messages.len(), 3);
    assert_eq!(report.snapshots_emitted, 3);
    assert!(messages.windows(2).all(|w| w[0].time <= w[1].time));

    let expected = BandPowerSnapshot::from_fn(|wave| {
        messages.iter().map(|m| m.data.get(wave)).sum::<f64>() / messages.len() as f64
    });
    assert_close(&report.final_averages.unwrap(), &expected);
}

#[test]
fn test_loss_before_first_emission_reports_no_data() {
    let (acquisition, recorder) = tone_loop(Duration::from_nanos(3_906_250), 100);
    let report = acquisition.run();
    assert!(recorder.messages().is_empty());
    assert_eq!(report.final_averages, None);
    assert_eq!(report.to_string(), "No band power data collected");
}

struct Unavailable;

impl SourceResolver for Unavailable {
    fn resolve(&self, signal_type: &str) -> Result<Box<dyn SampleSource>, DriverError> {
        Err(DriverError::HardwareNotFound(signal_type.to_string()))
    }
}

#[test]
fn test_missing_source_is_startup_failure() {
    let result = AcquisitionLoop::connect(
        &Unavailable,
        "EEG",
        AcquisitionConfig::default(),
        SnapshotEmitter::new(Arc::new(Recorder::default())),
        ManualClock::new(0.0),
    );
    assert!(matches!(result, Err(PipelineError::Startup(_))));
}

#[test]
fn test_mock_source_session_end_to_end() {
    let resolver = MockResolver::new(MockConfig {
        channels: 4,
        sample_rate: 256.0,
        duration: Some(Duration::from_secs(2)),
        realtime: false,
        seed: Some(9),
    });
    let recorder = Arc::new(Recorder::default());
    let acquisition = AcquisitionLoop::connect(
        &resolver,
        "EEG",
        AcquisitionConfig {
            emission_interval: Duration::ZERO,
            ..AcquisitionConfig::default()
        },
        SnapshotEmitter::new(recorder.clone()),
        ManualClock::new(0.0),
    )
    .unwrap();

    let report = acquisition.run();
    assert_eq!(report.end, LoopState::Terminated(TerminationReason::StreamLost));
    assert_eq!(report.samples_admitted, 512);
    // Every sample from the 256th on emits when the interval is zero.
    assert_eq!(report.snapshots_emitted, 257);
    assert_eq!(recorder.messages().len(), 257);
    assert!(report
        .final_averages
        .unwrap()
        .iter()
        .all(|(_, power)| power >= 0.0));
}
