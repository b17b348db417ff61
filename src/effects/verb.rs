//! Spectral reverb: per-bin peak hold with frequency-dependent decay.

use crate::core::control::Control;
use crate::stream::SpectralFrameStream;

use super::{FrameFollower, SpectralEffect};

/// Holds each bin at its recent peak and lets it decay toward the input.
///
/// `revtime` in `[0, 1]` sets the decay coefficient (mapped to
/// `[0.75, 1.0]`). `damp` in `[0, 1]` (mapped to `[0.997, 1.0]`) is raised
/// to the bin index, so higher bins fade faster.
#[derive(Debug, Clone)]
pub struct PvVerb {
    follower: FrameFollower,
    revtime: Control,
    damp: Control,
    magnitude_hold: Vec<f32>,
    frequency_hold: Vec<f32>,
}

impl PvVerb {
    pub fn new(
        input: &SpectralFrameStream,
        revtime: impl Into<Control>,
        damp: impl Into<Control>,
    ) -> Self {
        let bins = input.bins();
        Self {
            follower: FrameFollower::new(input.shape()),
            revtime: revtime.into(),
            damp: damp.into(),
            magnitude_hold: vec![0.0; bins],
            frequency_hold: vec![0.0; bins],
        }
    }

    pub fn set_revtime(&mut self, revtime: impl Into<Control>) {
        self.revtime = revtime.into();
    }

    pub fn set_damp(&mut self, damp: impl Into<Control>) {
        self.damp = damp.into();
    }

    fn clear_history(&mut self) {
        let bins = self.follower.shape().bins();
        for hold in [&mut self.magnitude_hold, &mut self.frequency_hold] {
            hold.clear();
            hold.resize(bins, 0.0);
        }
    }
}

/// Peak-hold with decay toward `input`.
#[inline]
fn hold(input: f32, held: f32, decay: f32) -> f32 {
    if input > held {
        input
    } else {
        input + (held - input) * decay
    }
}

impl SpectralEffect for PvVerb {
    fn process(&mut self, input: &SpectralFrameStream) {
        if self.follower.sync(input) {
            self.clear_history();
        }
        let Self {
            follower,
            revtime,
            damp,
            magnitude_hold,
            frequency_hold,
        } = self;
        follower.run(input, |i, slot, magnitude, frequency| {
            let revtime = revtime.at(i).clamp(0.0, 1.0) * 0.25 + 0.75;
            let damp = damp.at(i).clamp(0.0, 1.0) * 0.003 + 0.997;
            let (in_mag, in_freq) = input.slot(slot);
            let mut amp = 1.0;
            for k in 0..in_mag.len() {
                let decay = revtime * amp;
                magnitude_hold[k] = hold(in_mag[k], magnitude_hold[k], decay);
                frequency_hold[k] = hold(in_freq[k], frequency_hold[k], decay);
                magnitude[k] = magnitude_hold[k];
                frequency[k] = frequency_hold[k];
                amp *= damp;
            }
        });
    }

    fn output(&self) -> &SpectralFrameStream {
        self.follower.output()
    }

    fn reset(&mut self) {
        self.follower.rewind();
        self.clear_history();
    }
}
