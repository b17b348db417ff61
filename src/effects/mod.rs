//! Spectral operators: frame-stream in, frame-stream out.
//!
//! Every operator follows the same contract. It copies the upstream
//! progress counter, and for each sample at which a slot completes it
//! transforms that slot of the input and publishes the result into the same
//! slot of its own output. When the upstream shape changes, the output is
//! reallocated and all local history is discarded.

pub mod blend;
pub mod buffer;
pub mod delay;
pub mod filter;
pub mod gate;
pub mod loops;
pub mod modulation;
pub mod shift;
pub mod transpose;
pub mod verb;

pub use blend::{PvCross, PvMix, PvMorph, PvMult};
pub use buffer::PvBuffer;
pub use delay::PvDelay;
pub use filter::{FilterMode, PvFilter};
pub use gate::PvGate;
pub use loops::{PvBufLoops, PvBufTabLoops, SpeedDistribution};
pub use modulation::{PvAmpMod, PvFreqMod};
pub use shift::PvShift;
pub use transpose::PvTranspose;
pub use verb::PvVerb;

use crate::core::types::FrameShape;
use crate::error::PvocError;
use crate::stream::SpectralFrameStream;

/// A one-input spectral operator.
pub trait SpectralEffect: Send {
    /// Processes one block of `input`.
    fn process(&mut self, input: &SpectralFrameStream);

    /// The stream this operator publishes.
    fn output(&self) -> &SpectralFrameStream;

    /// Discards history and rewinds the slot cursor.
    fn reset(&mut self);
}

/// A two-input spectral operator.
pub trait SpectralBlend: Send {
    /// Processes one block of both inputs. Slots are read from both
    /// inputs at the same index, driven by the first input's progress.
    fn process(&mut self, first: &SpectralFrameStream, second: &SpectralFrameStream);

    fn output(&self) -> &SpectralFrameStream;

    fn reset(&mut self);
}

/// Output stream plus the consumer-side slot cursor shared by all
/// operators.
#[derive(Debug, Clone)]
pub struct FrameFollower {
    output: SpectralFrameStream,
    slot: usize,
}

impl FrameFollower {
    pub fn new(shape: FrameShape) -> Self {
        Self {
            output: SpectralFrameStream::new(shape),
            slot: 0,
        }
    }

    #[inline]
    pub fn output(&self) -> &SpectralFrameStream {
        &self.output
    }

    #[inline]
    pub fn shape(&self) -> FrameShape {
        self.output.shape()
    }

    /// Slot the next completed frame will be written to.
    #[inline]
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Reallocates when `input` changed shape. Returns true if it did, in
    /// which case the caller must drop its own history.
    pub fn sync(&mut self, input: &SpectralFrameStream) -> bool {
        let shape = input.shape();
        if shape == self.output.shape() {
            return false;
        }
        log::debug!(
            "operator following new shape fft_size={} overlaps={}",
            shape.fft_size,
            shape.overlaps
        );
        self.output.reshape(shape);
        self.slot = 0;
        true
    }

    /// Zeroes the output and rewinds the cursor.
    pub fn rewind(&mut self) {
        self.output.reshape(self.output.shape());
        self.slot = 0;
    }

    /// Runs `transform(sample_index, slot, magnitude, frequency)` for every
    /// ready sample of the current block of `input`.
    pub fn run<F>(&mut self, input: &SpectralFrameStream, mut transform: F)
    where
        F: FnMut(usize, usize, &mut [f32], &mut [f32]),
    {
        self.output.follow_progress(input);
        for i in 0..input.block_len() {
            if input.frame_ready(i) {
                let slot = self.slot;
                let (magnitude, frequency) = self.output.slot_mut(slot);
                transform(i, slot, magnitude, frequency);
                self.slot = (slot + 1) % self.output.overlaps();
            }
        }
    }
}

/// Adds `magnitude` into bin `dest` and overwrites its frequency.
/// Destinations outside the frame are dropped.
#[inline]
pub(crate) fn accumulate_bin(
    magnitude: &mut [f32],
    frequency: &mut [f32],
    dest: i64,
    mag: f32,
    freq: f32,
) {
    if dest >= 0 && (dest as usize) < magnitude.len() {
        let d = dest as usize;
        magnitude[d] += mag;
        frequency[d] = freq;
    }
}

/// Verifies that both inputs of a two-input operator share a shape.
pub(crate) fn check_same_shape(
    first: &SpectralFrameStream,
    second: &SpectralFrameStream,
) -> Result<(), PvocError> {
    if first.shape() != second.shape() {
        return Err(PvocError::ShapeMismatch {
            expected: first.shape(),
            found: second.shape(),
        });
    }
    Ok(())
}

/// Slot `slot` of a second input, or empty slices when that input has
/// been reconfigured to fewer overlaps since the operator was built.
#[inline]
pub(crate) fn side_slot(stream: &SpectralFrameStream, slot: usize) -> (&[f32], &[f32]) {
    if slot < stream.overlaps() {
        stream.slot(slot)
    } else {
        (&[], &[])
    }
}

/// Bin `k` of `values`, or 0 past its end.
#[inline]
pub(crate) fn bin_or_zero(values: &[f32], k: usize) -> f32 {
    values.get(k).copied().unwrap_or(0.0)
}

#[cfg(test)]
pub(crate) mod testing {
    //! Hand-driven frame streams for operator tests.

    use super::*;

    /// Stream whose every slot holds the given frame.
    pub fn filled(shape: FrameShape, magnitude: &[f32], frequency: &[f32]) -> SpectralFrameStream {
        let mut stream = SpectralFrameStream::new(shape);
        for slot in 0..shape.overlaps {
            stream.publish_slot(slot, magnitude, frequency);
        }
        stream
    }

    /// Starts a one-sample block that completes a slot.
    pub fn tick(stream: &mut SpectralFrameStream) {
        let last = stream.fft_size() - 1;
        stream.begin_block(1);
        stream.set_progress(0, last);
    }

    /// Starts a one-sample block that completes nothing.
    pub fn idle(stream: &mut SpectralFrameStream) {
        let first = stream.shape().input_latency();
        stream.begin_block(1);
        stream.set_progress(0, first);
    }

    /// Bin-centre frequencies for `shape` at 44.1 kHz.
    pub fn centre_frequencies(shape: FrameShape) -> Vec<f32> {
        let width = shape.bin_width(44100.0);
        (0..shape.bins()).map(|k| k as f32 * width).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn test_follower_publishes_on_ready_samples_only() {
        let shape = FrameShape::new(16, 2);
        let mut input = filled(shape, &[1.0; 8], &[0.0; 8]);
        let mut follower = FrameFollower::new(shape);
        let mut calls = 0;
        idle(&mut input);
        follower.run(&input, |_, _, _, _| calls += 1);
        assert_eq!(calls, 0);
        tick(&mut input);
        follower.run(&input, |_, slot, mag, _| {
            calls += 1;
            assert_eq!(slot, 0);
            mag[0] = 2.0;
        });
        assert_eq!(calls, 1);
        assert_eq!(follower.slot(), 1);
        assert_eq!(follower.output().magnitude(0)[0], 2.0);
        assert_eq!(follower.output().progress_block(), &[15]);
    }

    #[test]
    fn test_follower_sync_resets_cursor() {
        let mut follower = FrameFollower::new(FrameShape::new(16, 2));
        let mut input = SpectralFrameStream::new(FrameShape::new(16, 2));
        tick(&mut input);
        follower.run(&input, |_, _, _, _| {});
        assert_eq!(follower.slot(), 1);
        assert!(!follower.sync(&input));
        input.configure(32, 2);
        assert!(follower.sync(&input));
        assert_eq!(follower.slot(), 0);
        assert_eq!(follower.shape(), FrameShape::new(32, 2));
    }

    #[test]
    fn test_accumulate_bin_drops_out_of_range() {
        let mut mag = [0.0; 4];
        let mut freq = [0.0; 4];
        accumulate_bin(&mut mag, &mut freq, -1, 1.0, 10.0);
        accumulate_bin(&mut mag, &mut freq, 4, 1.0, 10.0);
        accumulate_bin(&mut mag, &mut freq, 2, 1.0, 10.0);
        accumulate_bin(&mut mag, &mut freq, 2, 0.5, 20.0);
        assert_eq!(mag, [0.0, 0.0, 1.5, 0.0]);
        assert_eq!(freq, [0.0, 0.0, 20.0, 0.0]);
    }

    #[test]
    fn test_side_slot_past_overlaps_is_empty() {
        let mut stream = SpectralFrameStream::new(FrameShape::new(16, 4));
        assert_eq!(side_slot(&stream, 3).0.len(), 8);
        stream.configure(16, 2);
        let (mag, freq) = side_slot(&stream, 3);
        assert!(mag.is_empty() && freq.is_empty());
        assert_eq!(side_slot(&stream, 1).0.len(), 8);
    }

    #[test]
    fn test_shape_check() {
        let a = SpectralFrameStream::new(FrameShape::new(64, 4));
        let b = SpectralFrameStream::new(FrameShape::new(128, 4));
        assert!(check_same_shape(&a, &a).is_ok());
        assert!(matches!(
            check_same_shape(&a, &b),
            Err(PvocError::ShapeMismatch { .. })
        ));
    }
}
