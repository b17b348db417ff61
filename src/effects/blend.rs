//! Two-input operators: cross-synthesis, multiplication, morphing, and mixing.
//!
//! All of them keep their own slot cursor and follow the progress counter of
//! the first input. Bins and slots missing from the second input read as
//! zero.

use crate::core::control::Control;
use crate::error::PvocError;
use crate::stream::SpectralFrameStream;

use super::{bin_or_zero, check_same_shape, side_slot, FrameFollower, SpectralBlend};

/// Fades the magnitudes of the first input toward the second's, keeping
/// the first input's frequencies.
#[derive(Debug, Clone)]
pub struct PvCross {
    follower: FrameFollower,
    fade: Control,
}

impl PvCross {
    pub fn new(
        first: &SpectralFrameStream,
        second: &SpectralFrameStream,
        fade: impl Into<Control>,
    ) -> Result<Self, PvocError> {
        check_same_shape(first, second)?;
        Ok(Self {
            follower: FrameFollower::new(first.shape()),
            fade: fade.into(),
        })
    }

    pub fn set_fade(&mut self, fade: impl Into<Control>) {
        self.fade = fade.into();
    }
}

impl SpectralBlend for PvCross {
    fn process(&mut self, first: &SpectralFrameStream, second: &SpectralFrameStream) {
        self.follower.sync(first);
        let fade = &self.fade;
        self.follower.run(first, |i, slot, magnitude, frequency| {
            let fade = fade.at(i);
            let (mag1, freq1) = first.slot(slot);
            let (mag2, _) = side_slot(second, slot);
            for k in 0..mag1.len() {
                magnitude[k] = mag1[k] + (bin_or_zero(mag2, k) - mag1[k]) * fade;
                frequency[k] = freq1[k];
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

/// Multiplies the magnitudes of both inputs (scaled by 10), keeping the
/// first input's frequencies.
#[derive(Debug, Clone)]
pub struct PvMult {
    follower: FrameFollower,
}

impl PvMult {
    pub fn new(
        first: &SpectralFrameStream,
        second: &SpectralFrameStream,
    ) -> Result<Self, PvocError> {
        check_same_shape(first, second)?;
        Ok(Self {
            follower: FrameFollower::new(first.shape()),
        })
    }
}

impl SpectralBlend for PvMult {
    fn process(&mut self, first: &SpectralFrameStream, second: &SpectralFrameStream) {
        self.follower.sync(first);
        self.follower.run(first, |_, slot, magnitude, frequency| {
            let (mag1, freq1) = first.slot(slot);
            let (mag2, _) = side_slot(second, slot);
            for k in 0..mag1.len() {
                magnitude[k] = mag1[k] * bin_or_zero(mag2, k) * 10.0;
                frequency[k] = freq1[k];
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

/// Interpolates magnitude linearly and frequency geometrically between
/// two inputs.
#[derive(Debug, Clone)]
pub struct PvMorph {
    follower: FrameFollower,
    fade: Control,
}

impl PvMorph {
    pub fn new(
        first: &SpectralFrameStream,
        second: &SpectralFrameStream,
        fade: impl Into<Control>,
    ) -> Result<Self, PvocError> {
        check_same_shape(first, second)?;
        Ok(Self {
            follower: FrameFollower::new(first.shape()),
            fade: fade.into(),
        })
    }

    pub fn set_fade(&mut self, fade: impl Into<Control>) {
        self.fade = fade.into();
    }
}

impl SpectralBlend for PvMorph {
    fn process(&mut self, first: &SpectralFrameStream, second: &SpectralFrameStream) {
        self.follower.sync(first);
        let fade = &self.fade;
        self.follower.run(first, |i, slot, magnitude, frequency| {
            let fade = fade.at(i);
            let (mag1, freq1) = first.slot(slot);
            let (mag2, freq2) = side_slot(second, slot);
            for k in 0..mag1.len() {
                let (m2, f2) = (bin_or_zero(mag2, k), bin_or_zero(freq2, k));
                magnitude[k] = mag1[k] + (m2 - mag1[k]) * fade;
                let ratio = if freq1[k] == 0.0 { 1.0e6 } else { f2 / freq1[k] };
                frequency[k] = freq1[k] * ratio.abs().powf(fade);
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

/// Keeps, per bin, whichever input is louder. Ties go to the second input.
#[derive(Debug, Clone)]
pub struct PvMix {
    follower: FrameFollower,
}

impl PvMix {
    pub fn new(
        first: &SpectralFrameStream,
        second: &SpectralFrameStream,
    ) -> Result<Self, PvocError> {
        check_same_shape(first, second)?;
        Ok(Self {
            follower: FrameFollower::new(first.shape()),
        })
    }
}

impl SpectralBlend for PvMix {
    fn process(&mut self, first: &SpectralFrameStream, second: &SpectralFrameStream) {
        self.follower.sync(first);
        self.follower.run(first, |_, slot, magnitude, frequency| {
            let (mag1, freq1) = first.slot(slot);
            let (mag2, freq2) = side_slot(second, slot);
            for k in 0..mag1.len() {
                let m2 = bin_or_zero(mag2, k);
                if m2 >= mag1[k] {
                    magnitude[k] = m2;
                    frequency[k] = bin_or_zero(freq2, k);
                } else {
                    magnitude[k] = mag1[k];
                    frequency[k] = freq1[k];
                }
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
