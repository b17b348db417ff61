use serde::{Deserialize, Serialize};

use crate::core::window::WindowType;
use crate::error::PvocError;

/// Smallest supported transform length.
pub const MIN_FFT_SIZE: usize = 16;
/// Largest supported transform length.
pub const MAX_FFT_SIZE: usize = 1 << 16;

/// Transform length and overlap count shared by every node on a frame stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameShape {
    pub fft_size: usize,
    pub overlaps: usize,
}

impl FrameShape {
    /// Creates a shape as given. Use [`FrameShape::normalized`] for
    /// user-supplied values.
    pub const fn new(fft_size: usize, overlaps: usize) -> Self {
        Self { fft_size, overlaps }
    }

    /// Rounds both values up to powers of two inside the supported range.
    ///
    /// Any correction is logged as a warning; the caller receives the
    /// effective shape.
    pub fn normalized(fft_size: usize, overlaps: usize) -> Self {
        let fft_size = round_to_power_of_two("FFT size", fft_size, MIN_FFT_SIZE, MAX_FFT_SIZE);
        let overlaps = round_to_power_of_two("overlap count", overlaps, 1, fft_size / 2);
        Self { fft_size, overlaps }
    }

    /// Samples between consecutive frames.
    #[inline]
    pub fn hop_size(&self) -> usize {
        self.fft_size / self.overlaps
    }

    /// Number of published bins per frame (`fft_size / 2`, Nyquist excluded).
    #[inline]
    pub fn bins(&self) -> usize {
        self.fft_size / 2
    }

    /// Samples the analyzer carries over between frames.
    #[inline]
    pub fn input_latency(&self) -> usize {
        self.fft_size - self.hop_size()
    }

    /// Width of one bin in Hz.
    #[inline]
    pub fn bin_width(&self, sample_rate: f32) -> f32 {
        sample_rate / self.fft_size as f32
    }
}

impl Default for FrameShape {
    fn default() -> Self {
        Self::new(1024, 4)
    }
}

/// Clamps `requested` to `[min, max]` and rounds up to the next power of two.
pub fn round_to_power_of_two(what: &str, requested: usize, min: usize, max: usize) -> usize {
    let value = requested.clamp(min, max.max(min)).next_power_of_two();
    if value != requested {
        log::warn!("{} {} is not a supported power of two, using {}", what, requested, value);
    }
    value
}

/// Sample rate as f32, rejecting 0.
pub(crate) fn checked_sample_rate(sample_rate: u32) -> Result<f32, PvocError> {
    if sample_rate == 0 {
        return Err(PvocError::InvalidParameter(
            "sample rate must be greater than 0".to_string(),
        ));
    }
    Ok(sample_rate as f32)
}

/// Parameters for an analysis front end and the nodes that follow it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PvocParams {
    /// Sample rate in Hz (default: 44100).
    pub sample_rate: u32,
    /// Transform length (default: 1024). Rounded up to a power of two.
    pub fft_size: usize,
    /// Interleaved analysis passes (default: 4). Rounded up to a power of two.
    pub overlaps: usize,
    /// Analysis/synthesis window (default: Hann).
    pub window: WindowType,
    /// Samples per processing tick (default: 256).
    pub block_size: usize,
}

impl Default for PvocParams {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            fft_size: 1024,
            overlaps: 4,
            window: WindowType::Hann,
            block_size: 256,
        }
    }
}

impl PvocParams {
    /// Set the sample rate.
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Set the FFT size.
    pub fn with_fft_size(mut self, fft_size: usize) -> Self {
        self.fft_size = fft_size;
        self
    }

    /// Set the overlap count.
    pub fn with_overlaps(mut self, overlaps: usize) -> Self {
        self.overlaps = overlaps;
        self
    }

    /// Set the window type.
    pub fn with_window(mut self, window: WindowType) -> Self {
        self.window = window;
        self
    }

    /// Set the block size.
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    /// Effective frame shape after power-of-two rounding.
    pub fn shape(&self) -> FrameShape {
        FrameShape::normalized(self.fft_size, self.overlaps)
    }

    /// Validate the parameters that cannot be corrected by rounding.
    pub fn validate(&self) -> Result<(), PvocError> {
        checked_sample_rate(self.sample_rate)?;
        if self.block_size == 0 {
            return Err(PvocError::InvalidParameter(
                "block size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
