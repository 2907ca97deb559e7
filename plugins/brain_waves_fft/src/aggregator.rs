//! Cross-channel band-power aggregation and the session's running averages.

use eeg_types::{BandPowerSnapshot, BrainWave, Sample};
use tracing::trace;

use crate::error::SpectralError;
use crate::welch::BandPowerEstimator;

/// Running per-band sums and the shared snapshot count.
///
/// All bands advance together: every update adds one value per band and
/// increments the single count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CumulativeStats {
    sums: BandPowerSnapshot,
    count: u64,
}

impl CumulativeStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, snapshot: &BandPowerSnapshot) {
        self.sums = BandPowerSnapshot::from_fn(|wave| self.sums.get(wave) + snapshot.get(wave));
        self.count += 1;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn sums(&self) -> &BandPowerSnapshot {
        &self.sums
    }

    /// Mean per band, or `None` before the first update.
    pub fn averages(&self) -> Option<BandPowerSnapshot> {
        if self.count == 0 {
            return None;
        }
        let count = self.count as f64;
        Some(BandPowerSnapshot::from_fn(|wave| self.sums.get(wave) / count))
    }
}

/// Computes cross-channel band powers from a full window and accumulates them
/// over the session.
#[derive(Clone)]
pub struct SpectralAggregator {
    estimator: BandPowerEstimator,
    channels: usize,
    cumulative: CumulativeStats,
}

impl SpectralAggregator {
    pub fn new(
        window_len: usize,
        sample_rate: f64,
        channels: usize,
    ) -> Result<Self, SpectralError> {
        if channels == 0 {
            return Err(SpectralError::NoChannels);
        }
        Ok(Self {
            estimator: BandPowerEstimator::new(window_len, sample_rate)?,
            channels,
            cumulative: CumulativeStats::new(),
        })
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn window_len(&self) -> usize {
        self.estimator.window_len()
    }

    pub fn sample_rate(&self) -> f64 {
        self.estimator.sample_rate()
    }

    /// Band power per band, averaged over channels, for the given window.
    ///
    /// `window` must hold exactly one window of samples, oldest first, each with
    /// the configured channel count.
    pub fn compute_snapshot(&self, window: &[Sample]) -> Result<BandPowerSnapshot, SpectralError> {
        if window.len() != self.estimator.window_len() {
            return Err(SpectralError::LengthMismatch {
                expected: self.estimator.window_len(),
                actual: window.len(),
            });
        }
        if let Some((index, sample)) = window
            .iter()
            .enumerate()
            .find(|(_, s)| s.channel_count() != self.channels)
        {
            return Err(SpectralError::ChannelMismatch {
                index,
                expected: self.channels,
                actual: sample.channel_count(),
            });
        }

        let mut totals = [0.0f64; 5];
        let mut column = Vec::with_capacity(window.len());
        for ch in 0..self.channels {
            column.clear();
            column.extend(window.iter().map(|s| s.channels[ch]));

            // One spectrum per channel serves all five bands.
            let spectrum = self.estimator.spectrum(&column)?;
            for (total, wave) in totals.iter_mut().zip(BrainWave::ALL) {
                *total += spectrum.band_power(&wave.band());
            }
        }

        let n = self.channels as f64;
        let snapshot = BandPowerSnapshot::from_fn(|wave| totals[wave as usize] / n);
        trace!(?snapshot, "computed band powers");
        Ok(snapshot)
    }

    /// Folds an emitted snapshot into the session averages.
    pub fn update_cumulative(&mut self, snapshot: &BandPowerSnapshot) {
        self.cumulative.update(snapshot);
    }

    /// Session averages, or `None` if nothing was emitted.
    pub fn final_averages(&self) -> Option<BandPowerSnapshot> {
        self.cumulative.averages()
    }

    pub fn cumulative(&self) -> &CumulativeStats {
        &self.cumulative
    }
}
