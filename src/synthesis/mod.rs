//! Spectral-frame to time-domain resynthesis.
//!
//! [`PvSynth`] rebuilds each frame with an inverse FFT and overlap-add;
//! [`PvAddSynth`] drives a bank of table oscillators from a subset of bins.

pub mod inverse;
pub mod oscillator_bank;

pub use inverse::PvSynth;
pub use oscillator_bank::PvAddSynth;
