//! Linear frequency shift by a whole number of bins.

use crate::core::control::Control;
use crate::core::types::checked_sample_rate;
use crate::error::PvocError;
use crate::stream::SpectralFrameStream;

use super::{accumulate_bin, FrameFollower, SpectralEffect};

/// Shifts every bin up (or down) by `shift` Hz.
///
/// The bin offset is `floor(shift / bin_width)`; frequencies are offset by
/// the exact shift, so partials keep their spacing in Hz rather than their
/// ratio.
#[derive(Debug, Clone)]
pub struct PvShift {
    follower: FrameFollower,
    sample_rate: f32,
    shift: Control,
}

impl PvShift {
    pub fn new(
        input: &SpectralFrameStream,
        sample_rate: u32,
        shift: impl Into<Control>,
    ) -> Result<Self, PvocError> {
        Ok(Self {
            follower: FrameFollower::new(input.shape()),
            sample_rate: checked_sample_rate(sample_rate)?,
            shift: shift.into(),
        })
    }

    /// Sets the shift in Hz.
    pub fn set_shift(&mut self, shift: impl Into<Control>) {
        self.shift = shift.into();
    }

    pub fn shift_mut(&mut self) -> &mut Control {
        &mut self.shift
    }
}

impl SpectralEffect for PvShift {
    fn process(&mut self, input: &SpectralFrameStream) {
        self.follower.sync(input);
        let bin_width = input.shape().bin_width(self.sample_rate);
        let shift = &self.shift;
        self.follower.run(input, |i, slot, magnitude, frequency| {
            let hz = shift.at(i);
            let offset = (hz / bin_width).floor() as i64;
            let (in_mag, in_freq) = input.slot(slot);
            magnitude.fill(0.0);
            frequency.fill(0.0);
            for k in 0..in_mag.len() {
                accumulate_bin(magnitude, frequency, k as i64 + offset, in_mag[k], in_freq[k] + hz);
            }
        });
    }

    fn output(&self) -> &SpectralFrameStream {
        self.follower.output()
    }

    fn reset(&mut self) {
        self.follower.rewind();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::FrameShape;
    use crate::effects::testing::*;

    #[test]
    fn test_shift_by_whole_bins() {
        let shape = FrameShape::new(1024, 4);
        let freq = centre_frequencies(shape);
        let mut mag = vec![0.0; 512];
        mag[10] = 1.0;
        let mut input = filled(shape, &mag, &freq);
        let width = shape.bin_width(44100.0);
        let mut op = PvShift::new(&input, 44100, 3.5 * width).unwrap();
        tick(&mut input);
        op.process(&input);
        let (out_mag, out_freq) = op.output().slot(0);
        assert_eq!(out_mag[13], 1.0);
        assert!((out_freq[13] - 13.5 * width).abs() < 1e-2);
    }

    #[test]
    fn test_downward_shift_drops_low_bins() {
        let shape = FrameShape::new(64, 1);
        let mut input = filled(shape, &[1.0; 32], &[0.0; 32]);
        let width = shape.bin_width(44100.0);
        let mut op = PvShift::new(&input, 44100, -4.5 * width).unwrap();
        tick(&mut input);
        op.process(&input);
        let out = op.output().magnitude(0);
        assert!(out[..27].iter().all(|&m| m == 1.0));
        assert!(out[27..].iter().all(|&m| m == 0.0));
    }

    #[test]
    fn test_zero_sample_rate_rejected() {
        let input = SpectralFrameStream::new(FrameShape::default());
        assert!(PvShift::new(&input, 0, 100.0).is_err());
    }
}
