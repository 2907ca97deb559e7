use std::f64::consts::PI;

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use crate::types::DriverError;

const TWO_PI: f64 = 2.0 * PI;

// Oscillator frequencies, one per band, in Hz.
const DELTA_FREQ: f64 = 2.5;
const THETA_FREQ: f64 = 6.0;
const ALPHA_FREQ: f64 = 10.0;
const BETA_FREQ: f64 = 20.0;
const GAMMA_FREQ: f64 = 40.0;

/// Per-channel band weights in `[delta, theta, alpha, beta, gamma]` order.
/// Channels beyond eight reuse the table.
const BASE_CHANNEL_WEIGHTS: [[f64; 5]; 8] = [
    [3.0, 1.5, 0.8, 0.4, 0.1], // Frontal left
    [3.0, 1.5, 0.8, 0.4, 0.1], // Frontal right
    [2.0, 1.2, 1.5, 0.6, 0.1], // Central left
    [2.0, 1.2, 1.5, 0.6, 0.1], // Central right
    [1.5, 1.0, 2.5, 0.7, 0.1], // Parietal left
    [1.5, 1.0, 2.5, 0.7, 0.1], // Parietal right
    [1.2, 0.8, 3.0, 0.5, 0.1], // Occipital left
    [1.2, 0.8, 3.0, 0.5, 0.1], // Occipital right
];

/// Amplitude of the synthetic signal in microvolts per unit weight.
const AMPLITUDE_UV: f64 = 10.0;
const NOISE_STD_DEV: f64 = 0.1;

/// A generator for realistic EEG-like data with multiple frequency bands.
///
/// Each channel mixes one oscillator per band, 50/60 Hz line noise and
/// gaussian background noise.
#[derive(Debug, Clone)]
pub struct EegGenerator {
    sample_rate: f64,
    num_channels: usize,
    // [channel][band] phase accumulators
    band_phases: Vec<[f64; 5]>,
    line_noise_phases: Vec<[f64; 2]>,
    line_noise_amplitude: Vec<f64>,
    channel_weights: Vec<[f64; 5]>,
    noise: Normal<f64>,
    rng: StdRng,
}

impl EegGenerator {
    pub fn new(sample_rate: f64, num_channels: usize) -> Result<Self, DriverError> {
        Self::with_rng(sample_rate, num_channels, StdRng::from_entropy())
    }

    /// Deterministic generator, for reproducible runs.
    pub fn with_seed(sample_rate: f64, num_channels: usize, seed: u64) -> Result<Self, DriverError> {
        Self::with_rng(sample_rate, num_channels, StdRng::seed_from_u64(seed))
    }

    fn with_rng(sample_rate: f64, num_channels: usize, mut rng: StdRng) -> Result<Self, DriverError> {
        debug!(
            "Initializing EEG generator with {} Hz sample rate, {} channels",
            sample_rate, num_channels
        );

        let mut band_phases = Vec::with_capacity(num_channels);
        let mut line_noise_phases = Vec::with_capacity(num_channels);
        let mut line_noise_amplitude = Vec::with_capacity(num_channels);
        let mut channel_weights = Vec::with_capacity(num_channels);

        for ch in 0..num_channels {
            let mut phases = [0.0; 5];
            for phase in phases.iter_mut() {
                *phase = rng.gen::<f64>() * TWO_PI;
            }
            band_phases.push(phases);
            line_noise_phases.push([rng.gen::<f64>() * TWO_PI, rng.gen::<f64>() * TWO_PI]);
            // Different channels pick up different amounts of line noise
            line_noise_amplitude.push(rng.gen_range(0.2..0.7));
            channel_weights.push(BASE_CHANNEL_WEIGHTS[ch % BASE_CHANNEL_WEIGHTS.len()]);
        }

        let noise = Normal::new(0.0, NOISE_STD_DEV)
            .map_err(|e| DriverError::ConfigurationError(format!("Invalid noise model: {}", e)))?;

        Ok(Self {
            sample_rate,
            num_channels,
            band_phases,
            line_noise_phases,
            line_noise_amplitude,
            channel_weights,
            noise,
            rng,
        })
    }

    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    /// Advances every oscillator by one sample period and returns one value per channel.
    pub fn next_sample(&mut self) -> Vec<f64> {
        let freqs = [DELTA_FREQ, THETA_FREQ, ALPHA_FREQ, BETA_FREQ, GAMMA_FREQ];
        let band_inc: Vec<f64> = freqs.iter().map(|f| TWO_PI * f / self.sample_rate).collect();
        let line_inc = [TWO_PI * 50.0 / self.sample_rate, TWO_PI * 60.0 / self.sample_rate];

        (0..self.num_channels)
            .map(|ch| {
                let mut signal = 0.0;
                for (band, inc) in band_inc.iter().enumerate() {
                    let phase = wrap_phase(self.band_phases[ch][band] + inc);
                    self.band_phases[ch][band] = phase;
                    signal += phase.sin() * self.channel_weights[ch][band];
                }

                let mix = [0.7, 0.3];
                for (i, inc) in line_inc.iter().enumerate() {
                    let phase = wrap_phase(self.line_noise_phases[ch][i] + inc);
                    self.line_noise_phases[ch][i] = phase;
                    signal += phase.sin() * self.line_noise_amplitude[ch] * mix[i];
                }

                signal += self.noise.sample(&mut self.rng);
                signal * AMPLITUDE_UV
            })
            .collect()
    }
}

/// Folds a phase back into `[0, 2π)`, however far it has run.
fn wrap_phase(phase: f64) -> f64 {
    phase.rem_euclid(TWO_PI)
}
