//! Time-domain to spectral-frame analysis.

pub mod analyzer;

pub use analyzer::{unwrap_phase, FrameObserver, PvAnalyzer};
