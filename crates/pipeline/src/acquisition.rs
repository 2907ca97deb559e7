//! The acquisition loop: pulls samples, slides the window, and emits band-power
//! snapshots on a fixed cadence until the source goes away.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use brain_waves_fft_plugin::SpectralAggregator;
use eeg_types::{BandPowerSnapshot, BrainWave, Sample, SensorError};
use sensors::{PullOutcome, SampleSource, SourceResolver};
use tracing::{error, info, trace, warn};

use crate::buffer::SampleBuffer;
use crate::clock::Clock;
use crate::emitter::{Broadcaster, SnapshotEmitter};
use crate::error::{PipelineError, PipelineResult};

/// Timing and windowing constants for one session.
#[derive(Debug, Clone, PartialEq)]
pub struct AcquisitionConfig {
    /// Window length in samples.
    pub window_size: usize,
    /// Minimum time between two emissions.
    pub emission_interval: Duration,
    /// Upper bound on a single pull.
    pub pull_timeout: Duration,
    /// `None` retries empty pulls forever. `Some(n)` treats the (n + 1)th
    /// consecutive empty pull as stream loss.
    pub max_consecutive_timeouts: Option<u32>,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            window_size: 256,
            emission_interval: Duration::from_secs(1),
            pull_timeout: Duration::from_secs(1),
            max_consecutive_timeouts: None,
        }
    }
}

impl AcquisitionConfig {
    pub fn validate(&self) -> PipelineResult<()> {
        if self.window_size < 2 {
            return Err(PipelineError::InvalidConfiguration {
                message: format!("window_size must be at least 2, got {}", self.window_size),
            });
        }
        if self.pull_timeout.is_zero() {
            return Err(PipelineError::InvalidConfiguration {
                message: "pull_timeout must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Why a streaming session ended.
#[derive(Debug, Clone, PartialEq)]
pub enum TerminationReason {
    /// The source reported loss, or stayed silent past the retry limit.
    StreamLost,
    /// An unexpected error or panic inside an iteration.
    Fault(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoopState {
    Connecting,
    Streaming,
    Terminated(TerminationReason),
    /// Stopped from outside through the stop flag.
    Drained,
}

impl LoopState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoopState::Terminated(_) | LoopState::Drained)
    }
}

/// What a finished session leaves behind.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    pub end: LoopState,
    pub samples_admitted: u64,
    pub snapshots_emitted: u64,
    /// `None` when no snapshot was emitted during the session.
    pub final_averages: Option<BandPowerSnapshot>,
}

impl fmt::Display for SessionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.final_averages {
            Some(averages) => {
                write!(f, "Average Wave Powers:")?;
                for wave in BrainWave::ALL {
                    write!(f, "\n{}: {:.2}", wave, averages.get(wave))?;
                }
                Ok(())
            }
            None => write!(f, "No band power data collected"),
        }
    }
}

pub struct AcquisitionLoop<B, C> {
    config: AcquisitionConfig,
    source: Box<dyn SampleSource>,
    buffer: SampleBuffer,
    aggregator: SpectralAggregator,
    emitter: SnapshotEmitter<B>,
    clock: C,
    state: LoopState,
    last_emission: Duration,
    consecutive_timeouts: u32,
    samples_admitted: u64,
    stop_flag: Option<Arc<AtomicBool>>,
}

impl<B: Broadcaster, C: Clock> AcquisitionLoop<B, C> {
    /// Discovers a source of `signal_type` and prepares a streaming session on it.
    pub fn connect(
        resolver: &dyn SourceResolver,
        signal_type: &str,
        config: AcquisitionConfig,
        emitter: SnapshotEmitter<B>,
        clock: C,
    ) -> PipelineResult<Self> {
        info!(state = ?LoopState::Connecting, "Looking for an {} stream...", signal_type);
        let source = resolver.resolve(signal_type).map_err(|e| {
            error!("Failed to resolve {} stream: {}", signal_type, e);
            PipelineError::Startup(e)
        })?;
        Self::with_source(source, config, emitter, clock)
    }

    /// Prepares a streaming session on an already opened source.
    pub fn with_source(
        source: Box<dyn SampleSource>,
        config: AcquisitionConfig,
        emitter: SnapshotEmitter<B>,
        clock: C,
    ) -> PipelineResult<Self> {
        config.validate()?;
        let aggregator =
            SpectralAggregator::new(config.window_size, source.sample_rate(), source.channel_count())?;

        info!(
            state = ?LoopState::Streaming,
            channels = source.channel_count(),
            sample_rate = source.sample_rate(),
            window = config.window_size,
            "Connected to stream"
        );

        Ok(Self {
            buffer: SampleBuffer::new(config.window_size),
            last_emission: clock.elapsed(),
            config,
            source,
            aggregator,
            emitter,
            clock,
            state: LoopState::Streaming,
            consecutive_timeouts: 0,
            samples_admitted: 0,
            stop_flag: None,
        })
    }

    /// Lets another execution context end the session by setting `flag`.
    pub fn with_stop_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.stop_flag = Some(flag);
        self
    }

    pub fn state(&self) -> &LoopState {
        &self.state
    }

    pub fn buffer(&self) -> &SampleBuffer {
        &self.buffer
    }

    pub fn emitter(&self) -> &SnapshotEmitter<B> {
        &self.emitter
    }

    /// One pull, one admission, and at most one emission.
    ///
    /// Stream loss and drain are reported through [`state`](Self::state);
    /// an `Err` is an unexpected fault the caller should end the session on.
    pub fn step(&mut self) -> PipelineResult<()> {
        if self.state != LoopState::Streaming {
            return Ok(());
        }

        if let Some(flag) = &self.stop_flag {
            if flag.load(Ordering::Relaxed) {
                self.transition(LoopState::Drained);
                return Ok(());
            }
        }

        match self.source.pull_sample(self.config.pull_timeout) {
            Ok(PullOutcome::Sample(sample)) => {
                self.consecutive_timeouts = 0;
                self.admit(sample)?;
                self.maybe_emit()
            }
            Ok(PullOutcome::Timeout) => {
                self.consecutive_timeouts += 1;
                trace!(consecutive = self.consecutive_timeouts, "no sample this iteration");
                if let Some(limit) = self.config.max_consecutive_timeouts {
                    if self.consecutive_timeouts > limit {
                        warn!("No samples for {} consecutive pulls", self.consecutive_timeouts);
                        self.transition(LoopState::Terminated(TerminationReason::StreamLost));
                    }
                }
                Ok(())
            }
            Ok(PullOutcome::Lost) | Err(SensorError::Disconnected) => {
                self.transition(LoopState::Terminated(TerminationReason::StreamLost));
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Streams until the source is lost, a fault occurs, or the stop flag is set,
    /// then reports the session averages.
    pub fn run(mut self) -> SessionReport {
        while self.state == LoopState::Streaming {
            match panic::catch_unwind(AssertUnwindSafe(|| self.step())) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!("Error during streaming: {}", e);
                    self.transition(LoopState::Terminated(TerminationReason::Fault(e.to_string())));
                }
                Err(payload) => {
                    let message = panic_message(payload);
                    error!("Panic during streaming: {}", message);
                    self.transition(LoopState::Terminated(TerminationReason::Fault(message)));
                }
            }
        }
        self.finish()
    }

    /// Stops pulling and computes the final report. Valid in any state.
    pub fn finish(mut self) -> SessionReport {
        if let Err(e) = self.source.shutdown() {
            warn!("Failed to shut down sample source: {}", e);
        }

        let report = SessionReport {
            end: self.state.clone(),
            samples_admitted: self.samples_admitted,
            snapshots_emitted: self.emitter.emitted(),
            final_averages: self.aggregator.final_averages(),
        };
        info!(
            samples = report.samples_admitted,
            snapshots = report.snapshots_emitted,
            "Session finished\n{}",
            report
        );
        report
    }

    fn admit(&mut self, sample: Sample) -> PipelineResult<()> {
        let expected = self.aggregator.channels();
        if sample.channel_count() != expected {
            return Err(PipelineError::ChannelMismatch {
                expected,
                actual: sample.channel_count(),
            });
        }
        self.buffer.admit(sample);
        self.samples_admitted += 1;
        Ok(())
    }

    fn maybe_emit(&mut self) -> PipelineResult<()> {
        if !self.buffer.is_full() {
            return Ok(());
        }
        let now = self.clock.elapsed();
        if now.saturating_sub(self.last_emission) < self.config.emission_interval {
            return Ok(());
        }

        let snapshot = self
            .aggregator
            .compute_snapshot(self.buffer.snapshot_contents())?;
        self.aggregator.update_cumulative(&snapshot);
        self.emitter.emit(snapshot, self.clock.epoch_seconds())?;
        self.last_emission = self.clock.elapsed();
        Ok(())
    }

    fn transition(&mut self, next: LoopState) {
        match &next {
            LoopState::Terminated(TerminationReason::StreamLost) => {
                info!("Lost EEG stream connection")
            }
            LoopState::Terminated(TerminationReason::Fault(reason)) => {
                warn!("Streaming terminated by fault: {}", reason)
            }
            LoopState::Drained => info!("Stop requested, draining session"),
            _ => {}
        }
        self.state = next;
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic payload".to_string()
    }
}
