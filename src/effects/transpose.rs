//! Multiplicative pitch transposition by bin remapping.

use crate::core::control::Control;
use crate::stream::SpectralFrameStream;

use super::{accumulate_bin, FrameFollower, SpectralEffect};

/// Moves bin `k` to `floor(k * ratio)` and scales its frequency by `ratio`.
///
/// Colliding bins sum their magnitudes; the last writer sets the
/// frequency. Bins landing outside the frame are dropped.
#[derive(Debug, Clone)]
pub struct PvTranspose {
    follower: FrameFollower,
    transpo: Control,
}

impl PvTranspose {
    pub fn new(input: &SpectralFrameStream, transpo: impl Into<Control>) -> Self {
        Self {
            follower: FrameFollower::new(input.shape()),
            transpo: transpo.into(),
        }
    }

    /// Sets the transposition ratio (1.0 = unchanged).
    pub fn set_transpo(&mut self, transpo: impl Into<Control>) {
        self.transpo = transpo.into();
    }

    pub fn transpo_mut(&mut self) -> &mut Control {
        &mut self.transpo
    }
}

impl SpectralEffect for PvTranspose {
    fn process(&mut self, input: &SpectralFrameStream) {
        self.follower.sync(input);
        let transpo = &self.transpo;
        self.follower.run(input, |i, slot, magnitude, frequency| {
            let ratio = transpo.at(i);
            let (in_mag, in_freq) = input.slot(slot);
            magnitude.fill(0.0);
            frequency.fill(0.0);
            for k in 0..in_mag.len() {
                let dest = (k as f32 * ratio).floor() as i64;
                accumulate_bin(magnitude, frequency, dest, in_mag[k], in_freq[k] * ratio);
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
