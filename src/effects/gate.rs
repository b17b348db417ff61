//! Spectral noise gate.

use crate::core::control::Control;
use crate::stream::SpectralFrameStream;

use super::{FrameFollower, SpectralEffect};

/// Attenuates bins whose magnitude is below a threshold in dB.
///
/// Gated bins are multiplied by `damp`; frequencies pass unchanged. With
/// `inverse` set, bins above the threshold are attenuated instead.
#[derive(Debug, Clone)]
pub struct PvGate {
    follower: FrameFollower,
    thresh: Control,
    damp: Control,
    inverse: bool,
}

impl PvGate {
    pub fn new(
        input: &SpectralFrameStream,
        thresh: impl Into<Control>,
        damp: impl Into<Control>,
    ) -> Self {
        Self {
            follower: FrameFollower::new(input.shape()),
            thresh: thresh.into(),
            damp: damp.into(),
            inverse: false,
        }
    }

    /// Threshold in dB (default -20).
    pub fn set_thresh(&mut self, thresh: impl Into<Control>) {
        self.thresh = thresh.into();
    }

    /// Gain applied to gated bins (default 0).
    pub fn set_damp(&mut self, damp: impl Into<Control>) {
        self.damp = damp.into();
    }

    pub fn set_inverse(&mut self, inverse: bool) {
        self.inverse = inverse;
    }

    pub fn with_inverse(mut self, inverse: bool) -> Self {
        self.inverse = inverse;
        self
    }
}

impl SpectralEffect for PvGate {
    fn process(&mut self, input: &SpectralFrameStream) {
        self.follower.sync(input);
        let (thresh, damp, inverse) = (&self.thresh, &self.damp, self.inverse);
        self.follower.run(input, |i, slot, magnitude, frequency| {
            let threshold = 10f32.powf(thresh.at(i) * 0.05);
            let damp = damp.at(i);
            let (in_mag, in_freq) = input.slot(slot);
            for k in 0..in_mag.len() {
                let gated = if inverse {
                    in_mag[k] > threshold
                } else {
                    in_mag[k] < threshold
                };
                magnitude[k] = if gated { in_mag[k] * damp } else { in_mag[k] };
                frequency[k] = in_freq[k];
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
