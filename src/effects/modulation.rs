//! Banks of per-bin low-frequency oscillators modulating amplitude or
//! frequency.
//!
//! Each bin owns a table pointer advanced once per frame. Bin `k` runs at
//! `basefreq * (1 + spread * 0.001)^k` Hz, so a non-zero spread fans the
//! modulation rates out across the spectrum.

use crate::core::control::Control;
use crate::core::table::{LookupTable, Waveform, SINE_TABLE_SIZE};
use crate::core::types::{checked_sample_rate, FrameShape};
use crate::error::PvocError;
use crate::stream::SpectralFrameStream;

use super::{accumulate_bin, FrameFollower, SpectralEffect};

/// Per-bin oscillator state shared by [`PvAmpMod`] and [`PvFreqMod`].
#[derive(Debug, Clone)]
struct ModulatorBank {
    table: LookupTable,
    shape: Waveform,
    pointers: Vec<f32>,
}

impl ModulatorBank {
    fn new(shape: Waveform, bins: usize) -> Self {
        Self {
            table: LookupTable::waveform(shape, SINE_TABLE_SIZE),
            shape,
            pointers: vec![0.0; bins],
        }
    }

    fn set_shape(&mut self, shape: Waveform) {
        self.shape = shape;
        self.table = LookupTable::waveform(shape, SINE_TABLE_SIZE);
    }

    fn reset(&mut self, bins: usize) {
        self.pointers.clear();
        self.pointers.resize(bins, 0.0);
    }

    /// Calls `apply(k, value)` with each bin's current table value, then
    /// advances the pointers by one frame.
    fn step<F>(&mut self, basefreq: f32, spread: f32, frame_rate: f32, mut apply: F)
    where
        F: FnMut(usize, f32),
    {
        let len = self.table.len() as f32;
        let per_frame = len / frame_rate;
        let ratio = spread.clamp(-1.0, 1.0) * 0.001 + 1.0;
        let mut freq = basefreq;
        for (k, pointer) in self.pointers.iter_mut().enumerate() {
            apply(k, self.table.interpolate(*pointer));
            *pointer = (*pointer + freq * per_frame).rem_euclid(len);
            freq *= ratio;
        }
    }
}

/// Frames per second at `shape`'s hop.
fn frame_rate(sample_rate: f32, shape: FrameShape) -> f32 {
    sample_rate / shape.hop_size() as f32
}

/// Tremolo per bin: magnitude times `0.5 + 0.5 * lfo`.
#[derive(Debug, Clone)]
pub struct PvAmpMod {
    follower: FrameFollower,
    sample_rate: f32,
    basefreq: Control,
    spread: Control,
    bank: ModulatorBank,
}

impl PvAmpMod {
    pub fn new(
        input: &SpectralFrameStream,
        sample_rate: u32,
        basefreq: impl Into<Control>,
        spread: impl Into<Control>,
        shape: Waveform,
    ) -> Result<Self, PvocError> {
        Ok(Self {
            follower: FrameFollower::new(input.shape()),
            sample_rate: checked_sample_rate(sample_rate)?,
            basefreq: basefreq.into(),
            spread: spread.into(),
            bank: ModulatorBank::new(shape, input.bins()),
        })
    }

    /// Modulation rate of bin 0 in Hz.
    pub fn set_basefreq(&mut self, basefreq: impl Into<Control>) {
        self.basefreq = basefreq.into();
    }

    /// Rate spread across bins, in `[-1, 1]`.
    pub fn set_spread(&mut self, spread: impl Into<Control>) {
        self.spread = spread.into();
    }

    pub fn set_shape(&mut self, shape: Waveform) {
        self.bank.set_shape(shape);
    }

    pub fn shape(&self) -> Waveform {
        self.bank.shape
    }

    /// Rewinds every oscillator to phase 0.
    pub fn reset_phases(&mut self) {
        let bins = self.follower.shape().bins();
        self.bank.reset(bins);
    }
}

impl SpectralEffect for PvAmpMod {
    fn process(&mut self, input: &SpectralFrameStream) {
        if self.follower.sync(input) {
            self.reset_phases();
        }
        let frame_rate = frame_rate(self.sample_rate, input.shape());
        let Self {
            follower,
            basefreq,
            spread,
            bank,
            ..
        } = self;
        follower.run(input, |i, slot, magnitude, frequency| {
            let (in_mag, in_freq) = input.slot(slot);
            bank.step(basefreq.at(i), spread.at(i), frame_rate, |k, lfo| {
                magnitude[k] = in_mag[k] * (lfo * 0.5 + 0.5);
                frequency[k] = in_freq[k];
            });
        });
    }

    fn output(&self) -> &SpectralFrameStream {
        self.follower.output()
    }

    fn reset(&mut self) {
        self.follower.rewind();
        self.reset_phases();
    }
}

/// Vibrato per bin: frequency times `1 + lfo * depth`, with the bin moved
/// to match its new frequency.
#[derive(Debug, Clone)]
pub struct PvFreqMod {
    follower: FrameFollower,
    sample_rate: f32,
    basefreq: Control,
    spread: Control,
    depth: Control,
    bank: ModulatorBank,
}

impl PvFreqMod {
    pub fn new(
        input: &SpectralFrameStream,
        sample_rate: u32,
        basefreq: impl Into<Control>,
        spread: impl Into<Control>,
        depth: impl Into<Control>,
        shape: Waveform,
    ) -> Result<Self, PvocError> {
        Ok(Self {
            follower: FrameFollower::new(input.shape()),
            sample_rate: checked_sample_rate(sample_rate)?,
            basefreq: basefreq.into(),
            spread: spread.into(),
            depth: depth.into(),
            bank: ModulatorBank::new(shape, input.bins()),
        })
    }

    pub fn set_basefreq(&mut self, basefreq: impl Into<Control>) {
        self.basefreq = basefreq.into();
    }

    pub fn set_spread(&mut self, spread: impl Into<Control>) {
        self.spread = spread.into();
    }

    /// Relative frequency deviation at full modulation.
    pub fn set_depth(&mut self, depth: impl Into<Control>) {
        self.depth = depth.into();
    }

    pub fn set_shape(&mut self, shape: Waveform) {
        self.bank.set_shape(shape);
    }

    pub fn shape(&self) -> Waveform {
        self.bank.shape
    }

    pub fn reset_phases(&mut self) {
        let bins = self.follower.shape().bins();
        self.bank.reset(bins);
    }
}

impl SpectralEffect for PvFreqMod {
    fn process(&mut self, input: &SpectralFrameStream) {
        if self.follower.sync(input) {
            self.reset_phases();
        }
        let shape = input.shape();
        let frame_rate = frame_rate(self.sample_rate, shape);
        let bin_width = shape.bin_width(self.sample_rate);
        let Self {
            follower,
            basefreq,
            spread,
            depth,
            bank,
            ..
        } = self;
        follower.run(input, |i, slot, magnitude, frequency| {
            let depth = depth.at(i);
            let (in_mag, in_freq) = input.slot(slot);
            magnitude.fill(0.0);
            frequency.fill(0.0);
            bank.step(basefreq.at(i), spread.at(i), frame_rate, |k, lfo| {
                let freq = in_freq[k] * (lfo * depth + 1.0);
                let dest = (freq / bin_width).round() as i64;
                accumulate_bin(magnitude, frequency, dest, in_mag[k], freq);
            });
        });
    }

    fn output(&self) -> &SpectralFrameStream {
        self.follower.output()
    }

    fn reset(&mut self) {
        self.follower.rewind();
        self.reset_phases();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::testing::*;

    const SHAPE: FrameShape = FrameShape::new(64, 4);

    #[test]
    fn test_ampmod_starts_at_half_gain_and_varies() {
        let freq = centre_frequencies(SHAPE);
        let mut input = filled(SHAPE, &[1.0; 32], &freq);
        let mut op = PvAmpMod::new(&input, 44100, 500.0, 0.0, Waveform::Sine).unwrap();
        tick(&mut input);
        op.process(&input);
        // sin(0) = 0
        assert!(op.output().magnitude(0).iter().all(|&m| (m - 0.5).abs() < 1e-6));
        assert_eq!(op.output().frequency(0), &freq[..]);

        let mut levels = Vec::new();
        for frame in 1..=40 {
            tick(&mut input);
            op.process(&input);
            levels.push(op.output().magnitude(frame % 4)[0]);
        }
        let max = levels.iter().cloned().fold(f32::MIN, f32::max);
        let min = levels.iter().cloned().fold(f32::MAX, f32::min);
        assert!(max > 0.9 && min < 0.1, "range {}..{}", min, max);
    }

    #[test]
    fn test_ampmod_spread_detunes_bins() {
        let mut input = filled(SHAPE, &[1.0; 32], &[0.0; 32]);
        let mut op = PvAmpMod::new(&input, 44100, 5.0, 1.0, Waveform::Sine).unwrap();
        for _ in 0..3 {
            tick(&mut input);
            op.process(&input);
        }
        let mag = op.output().magnitude(2);
        assert!(mag[31] > mag[0]);
    }

    #[test]
    fn test_reset_rewinds_phases() {
        let mut input = filled(SHAPE, &[1.0; 32], &[0.0; 32]);
        let mut op = PvAmpMod::new(&input, 44100, 30.0, 0.0, Waveform::Saw).unwrap();
        for _ in 0..5 {
            tick(&mut input);
            op.process(&input);
        }
        SpectralEffect::reset(&mut op);
        tick(&mut input);
        op.process(&input);
        // Saw starts at 1: full gain
        assert!((op.output().magnitude(0)[7] - 1.0).abs() < 1e-6);
        assert_eq!(op.shape(), Waveform::Saw);
    }

    #[test]
    fn test_freqmod_zero_depth_keeps_centred_bins() {
        let freq = centre_frequencies(SHAPE);
        let mag: Vec<f32> = (0..32).map(|k| k as f32).collect();
        let mut input = filled(SHAPE, &mag, &freq);
        let mut op = PvFreqMod::new(&input, 44100, 4.0, 0.0, 0.0, Waveform::Sine).unwrap();
        for _ in 0..3 {
            tick(&mut input);
            op.process(&input);
        }
        assert_eq!(op.output().magnitude(2), &mag[..]);
    }

    #[test]
    fn test_freqmod_moves_energy_and_drops_overflow() {
        let freq = centre_frequencies(SHAPE);
        let mut input = filled(SHAPE, &[1.0; 32], &freq);
        // Square starts at +1: every frequency doubles with depth 1
        let mut op = PvFreqMod::new(&input, 44100, 1.0, 0.0, 1.0, Waveform::Square).unwrap();
        tick(&mut input);
        op.process(&input);
        let (mag, out_freq) = op.output().slot(0);
        assert_eq!(mag[4], 1.0);
        assert_eq!(mag[5], 0.0);
        assert!((out_freq[4] - freq[2] * 2.0).abs() < 1e-3);
        assert_eq!(mag.iter().sum::<f32>(), 16.0);
    }
}
