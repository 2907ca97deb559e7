//! Brain Waves band-power analysis
//!
//! Turns a window of multi-channel EEG samples into per-band power
//! (Delta, Theta, Alpha, Beta, Gamma), averaged across channels, and keeps the
//! running session averages.

pub mod aggregator;
pub mod error;
pub mod welch;

pub use aggregator::{CumulativeStats, SpectralAggregator};
pub use error::SpectralError;
pub use welch::{band_power, BandPowerEstimator, PowerSpectrum};
