//! Single-segment Welch power spectral density and band-power integration.
//!
//! The estimate matches the classic averaged-periodogram defaults with one
//! segment spanning the whole window: constant detrend, periodic Hann taper,
//! one-sided density scaling.

use std::sync::Arc;

use apodize::hanning_iter;
use eeg_types::FrequencyBand;
use rustfft::{num_complex::Complex, Fft, FftPlanner};

use crate::error::SpectralError;

/// One-sided power spectral density of a single window.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerSpectrum {
    /// Bin centre frequencies, `k * sample_rate / n` for `k = 0..=n/2`.
    pub frequencies: Vec<f64>,
    /// Density per bin, in signal units squared per Hz.
    pub density: Vec<f64>,
}

impl PowerSpectrum {
    /// Frequency spacing between adjacent bins.
    pub fn resolution(&self) -> f64 {
        match self.frequencies.get(1) {
            Some(f) => *f,
            None => 0.0,
        }
    }

    /// Sum of the density over every bin whose centre lies inside `band`, edges included.
    pub fn band_power(&self, band: &FrequencyBand) -> f64 {
        self.frequencies
            .iter()
            .zip(&self.density)
            .filter(|(freq, _)| band.contains(**freq))
            .map(|(_, p)| *p)
            .sum()
    }
}

/// Estimates band power for one channel's window at a fixed length and sample rate.
///
/// The FFT plan and taper are built once and reused for every window.
#[derive(Clone)]
pub struct BandPowerEstimator {
    window_len: usize,
    sample_rate: f64,
    fft: Arc<dyn Fft<f64>>,
    taper: Vec<f64>,
    // 1 / (fs * sum(w^2))
    density_scale: f64,
}

impl BandPowerEstimator {
    pub fn new(window_len: usize, sample_rate: f64) -> Result<Self, SpectralError> {
        if window_len < 2 {
            return Err(SpectralError::InvalidWindow(window_len));
        }
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(SpectralError::InvalidSampleRate(sample_rate));
        }

        // Periodic Hann: the first n points of an (n + 1)-point symmetric window.
        let taper: Vec<f64> = hanning_iter(window_len + 1).take(window_len).collect();
        let window_power: f64 = taper.iter().map(|w| w * w).sum();

        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(window_len);

        Ok(Self {
            window_len,
            sample_rate,
            fft,
            taper,
            density_scale: 1.0 / (sample_rate * window_power),
        })
    }

    pub fn window_len(&self) -> usize {
        self.window_len
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Computes the one-sided PSD of `signal`, which must be exactly one window long.
    pub fn spectrum(&self, signal: &[f64]) -> Result<PowerSpectrum, SpectralError> {
        let n = self.window_len;
        if signal.len() != n {
            return Err(SpectralError::LengthMismatch {
                expected: n,
                actual: signal.len(),
            });
        }

        let mean = signal.iter().sum::<f64>() / n as f64;
        let mut buffer: Vec<Complex<f64>> = signal
            .iter()
            .zip(&self.taper)
            .map(|(x, w)| Complex::new((x - mean) * w, 0.0))
            .collect();

        self.fft.process(&mut buffer);

        let bins = n / 2 + 1;
        let mut density: Vec<f64> = buffer
            .iter()
            .take(bins)
            .map(|c| c.norm_sqr() * self.density_scale)
            .collect();

        // Fold negative frequencies in. DC, and Nyquist for even n, have no mirror.
        let last_folded = if n % 2 == 0 { bins - 1 } else { bins };
        for p in density.iter_mut().take(last_folded).skip(1) {
            *p *= 2.0;
        }

        let frequencies = (0..bins)
            .map(|k| k as f64 * self.sample_rate / n as f64)
            .collect();

        Ok(PowerSpectrum {
            frequencies,
            density,
        })
    }

    /// Power of `signal` within `band`: the PSD summed over in-band bins.
    pub fn estimate(&self, signal: &[f64], band: &FrequencyBand) -> Result<f64, SpectralError> {
        Ok(self.spectrum(signal)?.band_power(band))
    }
}

/// One-shot band power for a signal whose length is the window length.
pub fn band_power(
    signal: &[f64],
    sample_rate: f64,
    band: &FrequencyBand,
) -> Result<f64, SpectralError> {
    BandPowerEstimator::new(signal.len(), sample_rate)?.estimate(signal, band)
}

#[cfg(test)]
mod tests {
    use super::*;
    use eeg_types::BrainWave;
    use proptest::prelude::*;
    use std::f64::consts::PI;

    fn sine(freq: f64, sample_rate: f64, n: usize, amplitude: f64) -> Vec<f64> {
        (0..n)
            .map(|i| amplitude * (2.0 * PI * freq * i as f64 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn test_rejects_bad_parameters() {
        assert_eq!(
            BandPowerEstimator::new(1, 256.0).err(),
            Some(SpectralError::InvalidWindow(1))
        );
        assert!(matches!(
            BandPowerEstimator::new(256, 0.0),
            Err(SpectralError::InvalidSampleRate(_))
        ));
        let estimator = BandPowerEstimator::new(256, 256.0).unwrap();
        assert_eq!(
            estimator.spectrum(&[0.0; 10]).err(),
            Some(SpectralError::LengthMismatch {
                expected: 256,
                actual: 10
            })
        );
    }

    #[test]
    fn test_bin_layout() {
        let estimator = BandPowerEstimator::new(256, 256.0).unwrap();
        let spectrum = estimator.spectrum(&sine(10.0, 256.0, 256, 1.0)).unwrap();
        assert_eq!(spectrum.frequencies.len(), 129);
        assert_eq!(spectrum.frequencies[0], 0.0);
        assert_eq!(spectrum.frequencies[128], 128.0);
        assert_eq!(spectrum.resolution(), 1.0);

        let odd = BandPowerEstimator::new(255, 255.0).unwrap();
        let spectrum = odd.spectrum(&vec![0.0; 255]).unwrap();
        assert_eq!(spectrum.frequencies.len(), 128);
    }

    #[test]
    fn test_sine_power_lands_in_its_bins() {
        let estimator = BandPowerEstimator::new(256, 256.0).unwrap();
        let spectrum = estimator.spectrum(&sine(10.0, 256.0, 256, 1.0)).unwrap();

        // A periodic Hann taper spreads an on-bin tone over exactly three bins.
        let peak: f64 = spectrum.density[9..=11].iter().sum();
        let total: f64 = spectrum.density.iter().sum();
        assert!(peak / total > 0.999_999);
        assert!(spectrum.density[10] > spectrum.density[9]);

        // Density scaling preserves power: the integral is the variance, A^2 / 2.
        let integrated = total * spectrum.resolution();
        assert!((integrated - 0.5).abs() < 1e-9, "got {}", integrated);
    }

    #[test]
    fn test_constant_signal_has_no_power() {
        let estimator = BandPowerEstimator::new(128, 256.0).unwrap();
        let power = estimator
            .estimate(&vec![3.25; 128], &BrainWave::Delta.band())
            .unwrap();
        assert!(power.abs() < 1e-20);
        let zero = band_power(&vec![0.0; 128], 256.0, &BrainWave::Gamma.band()).unwrap();
        assert_eq!(zero, 0.0);
    }

    #[test]
    fn test_edge_bins_are_counted_in_both_adjacent_bands() {
        let estimator = BandPowerEstimator::new(256, 256.0).unwrap();
        let spectrum = estimator.spectrum(&sine(8.0, 256.0, 256, 1.0)).unwrap();

        let theta = spectrum.band_power(&BrainWave::Theta.band());
        let alpha = spectrum.band_power(&BrainWave::Alpha.band());
        // The 8 Hz bin belongs to both theta [4, 8] and alpha [8, 13].
        assert!(theta >= spectrum.density[8]);
        assert!(alpha >= spectrum.density[8]);
    }

    #[test]
    fn test_band_sum_matches_total_minus_shared_edges() {
        let estimator = BandPowerEstimator::new(256, 256.0).unwrap();
        let signal: Vec<f64> = (0..256)
            .map(|i| {
                let t = i as f64 / 256.0;
                (2.0 * PI * 3.0 * t).sin()
                    + 0.5 * (2.0 * PI * 11.3 * t).cos()
                    + 0.2 * (2.0 * PI * 47.0 * t).sin()
                    + 0.05 * ((i * 7919) % 13) as f64
            })
            .collect();
        let spectrum = estimator.spectrum(&signal).unwrap();

        let per_band: f64 = BrainWave::ALL
            .iter()
            .map(|w| spectrum.band_power(&w.band()))
            .sum();
        let total = spectrum.band_power(&FrequencyBand::new(0.5, 100.0));
        let shared: f64 = [4.0, 8.0, 13.0, 30.0]
            .iter()
            .map(|f| spectrum.density[*f as usize])
            .sum();

        assert!(per_band >= total);
        assert!(((per_band - shared) - total).abs() <= 1e-9 * total.max(1.0));
    }

    proptest! {
        #[test]
        fn prop_band_power_is_non_negative(
            signal in proptest::collection::vec(-1.0e6f64..1.0e6, 64),
            band_idx in 0usize..5,
        ) {
            let band = BrainWave::ALL[band_idx].band();
            let power = band_power(&signal, 128.0, &band).unwrap();
            prop_assert!(power >= 0.0);
        }
    }
}
