//! The fixed catalogue of brain-wave frequency bands and the per-band power snapshot.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A closed frequency interval `[low_hz, high_hz]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyBand {
    pub low_hz: f64,
    pub high_hz: f64,
}

impl FrequencyBand {
    pub const fn new(low_hz: f64, high_hz: f64) -> Self {
        Self { low_hz, high_hz }
    }

    /// Inclusive on both edges. Adjacent bands in the catalogue share their edge
    /// frequency, so a bin landing exactly on it is counted in both.
    pub fn contains(&self, freq_hz: f64) -> bool {
        freq_hz >= self.low_hz && freq_hz <= self.high_hz
    }
}

/// The five brain-wave bands, in ascending frequency order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrainWave {
    Delta,
    Theta,
    Alpha,
    Beta,
    Gamma,
}

impl BrainWave {
    pub const ALL: [BrainWave; 5] = [
        BrainWave::Delta,
        BrainWave::Theta,
        BrainWave::Alpha,
        BrainWave::Beta,
        BrainWave::Gamma,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            BrainWave::Delta => "delta",
            BrainWave::Theta => "theta",
            BrainWave::Alpha => "alpha",
            BrainWave::Beta => "beta",
            BrainWave::Gamma => "gamma",
        }
    }

    pub fn band(&self) -> FrequencyBand {
        match self {
            BrainWave::Delta => FrequencyBand::new(0.5, 4.0),
            BrainWave::Theta => FrequencyBand::new(4.0, 8.0),
            BrainWave::Alpha => FrequencyBand::new(8.0, 13.0),
            BrainWave::Beta => FrequencyBand::new(13.0, 30.0),
            BrainWave::Gamma => FrequencyBand::new(30.0, 100.0),
        }
    }
}

impl fmt::Display for BrainWave {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Capitalised for operator-facing reports.
        let name = self.name();
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => write!(f, "{}{}", first.to_ascii_uppercase(), chars.as_str()),
            None => Ok(()),
        }
    }
}

/// Cross-channel average power per band, computed from one window.
///
/// Field order is the wire order of the `data` object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BandPowerSnapshot {
    pub delta: f64,
    pub theta: f64,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

impl BandPowerSnapshot {
    /// Builds a snapshot by evaluating `f` once per band.
    pub fn from_fn<F>(mut f: F) -> Self
    where
        F: FnMut(BrainWave) -> f64,
    {
        Self {
            delta: f(BrainWave::Delta),
            theta: f(BrainWave::Theta),
            alpha: f(BrainWave::Alpha),
            beta: f(BrainWave::Beta),
            gamma: f(BrainWave::Gamma),
        }
    }

    pub fn get(&self, wave: BrainWave) -> f64 {
        match wave {
            BrainWave::Delta => self.delta,
            BrainWave::Theta => self.theta,
            BrainWave::Alpha => self.alpha,
            BrainWave::Beta => self.beta,
            BrainWave::Gamma => self.gamma,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (BrainWave, f64)> + '_ {
        BrainWave::ALL.iter().map(move |&wave| (wave, self.get(wave)))
    }

    /// The band carrying the most power. Ties resolve to the lower band.
    pub fn dominant(&self) -> BrainWave {
        let mut best = BrainWave::Delta;
        for (wave, power) in self.iter() {
            if power > self.get(best) {
                best = wave;
            }
        }
        best
    }
}
