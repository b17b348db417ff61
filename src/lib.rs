#![forbid(unsafe_code)]
//! Streaming phase-vocoder engine.
//!
//! `pvstream` turns a mono signal into a stream of overlapping
//! magnitude/frequency frames, runs those frames through spectral
//! operators, and rebuilds audio from them, one block at a time.
//!
//! The graph has three kinds of node:
//!
//! - [`PvAnalyzer`]: samples in, [`SpectralFrameStream`] out.
//! - Spectral operators in [`effects`]: one or two frame streams in, one out.
//! - [`PvSynth`] (inverse FFT) and [`PvAddSynth`] (oscillator bank): frame
//!   stream in, samples out.
//!
//! # Quick Start
//!
//! ```
//! use pvstream::{PvTranspose, PvocParams, SpectralChain};
//!
//! // 0.5 seconds of 440 Hz sine at 44.1 kHz
//! let input: Vec<f32> = (0..22050)
//!     .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 44100.0).sin())
//!     .collect();
//!
//! let params = PvocParams::default().with_fft_size(1024).with_overlaps(4);
//! let mut chain = SpectralChain::new(&params).unwrap();
//! let up_a_fifth = PvTranspose::new(chain.source(), 1.5);
//! chain.push_effect(up_a_fifth);
//!
//! let output = chain.render(&input, None);
//! assert_eq!(output.len(), input.len());
//! ```
//!
//! # Driving nodes by hand
//!
//! Every node can also be driven directly. Each call processes one block
//! and the downstream node reads the upstream node's stream:
//!
//! ```
//! use pvstream::{PvAnalyzer, PvGate, PvSynth, PvocParams, SpectralEffect};
//!
//! let params = PvocParams::default().with_fft_size(512);
//! let mut analyzer = PvAnalyzer::new(&params).unwrap();
//! let mut gate = PvGate::new(analyzer.output(), -30.0, 0.0);
//! let mut synth = PvSynth::new(gate.output(), params.sample_rate, params.window).unwrap();
//!
//! let block = vec![0.0f32; params.block_size];
//! analyzer.process(&block);
//! gate.process(analyzer.output());
//! let out = synth.process(gate.output());
//! assert_eq!(out.len(), block.len());
//! ```
//!
//! # Chain descriptions
//!
//! [`config::ChainConfig`] describes a whole chain as JSON and builds it
//! with [`config::ChainConfig::build`].

pub mod analysis;
pub mod config;
pub mod core;
pub mod effects;
pub mod error;
pub mod stream;
pub mod synthesis;

pub use analysis::{unwrap_phase, PvAnalyzer};
pub use config::{ChainConfig, ResynthesisConfig, StageConfig};
pub use core::control::Control;
pub use core::table::{LookupTable, Waveform};
pub use core::types::{FrameShape, PvocParams};
pub use core::window::WindowType;
pub use effects::{
    FilterMode, PvAmpMod, PvBufLoops, PvBufTabLoops, PvBuffer, PvCross, PvDelay, PvFilter,
    PvFreqMod, PvGate, PvMix, PvMorph, PvMult, PvShift, PvTranspose, PvVerb, SpectralBlend,
    SpectralEffect, SpeedDistribution,
};
pub use error::PvocError;
pub use stream::{Resynthesis, SpectralChain, SpectralFrameStream};
pub use synthesis::{PvAddSynth, PvSynth};
