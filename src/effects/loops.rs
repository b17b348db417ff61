//! Frame capture with independent per-bin looping playback.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::core::control::Control;
use crate::core::ring_buffer::FrameRing;
use crate::core::table::LookupTable;
use crate::core::types::checked_sample_rate;
use crate::error::PvocError;
use crate::stream::SpectralFrameStream;

use super::buffer::frames_for;
use super::delay::check_duration;
use super::{bin_or_zero, FrameFollower, SpectralEffect};

/// Rate of the exponential draws used by the random distributions.
const RANDOM_LAMBDA: f32 = 10.0;

/// How per-bin loop speeds are spread between `low` and `high`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedDistribution {
    /// Rises linearly with the bin index.
    #[default]
    Linear,
    /// Rises with the square of the normalized bin index.
    Exponential,
    /// Rises with the square root of the normalized bin index.
    Logarithmic,
    /// Uniform random per bin.
    Random,
    /// Exponential random draw clustered near `low`.
    RandomExpMin,
    /// Exponential random draw clustered near `high`.
    RandomExpMax,
    /// Two-sided exponential random draw around the midpoint.
    RandomBiExp,
}

impl SpeedDistribution {
    /// Maps the classic integer mode selector, clamping out-of-range values.
    pub fn from_index(index: usize) -> Self {
        const TABLE: [SpeedDistribution; 7] = [
            SpeedDistribution::Linear,
            SpeedDistribution::Exponential,
            SpeedDistribution::Logarithmic,
            SpeedDistribution::Random,
            SpeedDistribution::RandomExpMin,
            SpeedDistribution::RandomExpMax,
            SpeedDistribution::RandomBiExp,
        ];
        match TABLE.get(index) {
            Some(d) => *d,
            None => {
                log::warn!("loop speed mode {} out of range, using bi-exponential", index);
                SpeedDistribution::RandomBiExp
            }
        }
    }

    /// Position in `[0, 1]` of bin `k` of `bins` between the two bounds.
    fn position(self, k: usize, bins: usize, rng: &mut StdRng) -> f32 {
        let t = k as f32 / bins as f32;
        match self {
            SpeedDistribution::Linear => t,
            SpeedDistribution::Exponential => t * t,
            SpeedDistribution::Logarithmic => t.sqrt(),
            SpeedDistribution::Random => rng.gen::<f32>(),
            SpeedDistribution::RandomExpMin => {
                (-rng.gen::<f32>().ln() / RANDOM_LAMBDA).min(1.0)
            }
            SpeedDistribution::RandomExpMax => {
                (1.0 - (-rng.gen::<f32>().ln() / RANDOM_LAMBDA)).max(0.0)
            }
            SpeedDistribution::RandomBiExp => bi_exponential(rng.gen::<f32>(), RANDOM_LAMBDA),
        }
    }
}

/// Two-sided exponential draw mapped around 0.5 from a uniform `u` in
/// `[0, 1)`, clamped to `[0, 1]` after the log.
fn bi_exponential(u: f32, lambda: f32) -> f32 {
    let mut sum = 2.0 * u;
    let polar = if sum > 1.0 {
        sum = 2.0 - sum;
        -1.0
    } else {
        1.0
    };
    (0.5 * (polar * sum.ln() / lambda) + 0.5).clamp(0.0, 1.0)
}

/// Recorded frames plus one read pointer per bin in `[0, 1)`.
#[derive(Debug, Clone)]
struct FrameLoop {
    recording: FrameRing,
    pointers: Vec<f32>,
}

impl FrameLoop {
    fn new(frames: usize, bins: usize) -> Self {
        Self {
            recording: FrameRing::new(frames, bins),
            pointers: vec![0.0; bins],
        }
    }

    fn is_full(&self) -> bool {
        self.recording.is_full()
    }

    /// Records one frame and passes it through.
    fn capture(
        &mut self,
        in_mag: &[f32],
        in_freq: &[f32],
        magnitude: &mut [f32],
        frequency: &mut [f32],
    ) {
        self.recording.push(in_mag, in_freq);
        magnitude.copy_from_slice(in_mag);
        frequency.copy_from_slice(in_freq);
    }

    /// Reads every bin at its pointer and advances it by `speed(k)` loops
    /// per frame count.
    fn play<S>(&mut self, speed: S, magnitude: &mut [f32], frequency: &mut [f32])
    where
        S: Fn(usize) -> f32,
    {
        let frames = self.recording.capacity();
        for (k, pointer) in self.pointers.iter_mut().enumerate() {
            let index = ((*pointer * frames as f32) as usize).min(frames - 1);
            let frame = self.recording.frame(index);
            magnitude[k] = frame.magnitude[k];
            frequency[k] = frame.frequency[k];
            *pointer = (*pointer + speed(k) / frames as f32).rem_euclid(1.0);
        }
    }

    fn rewind(&mut self) {
        self.pointers.fill(0.0);
    }

    fn clear(&mut self) {
        self.recording.clear();
        self.rewind();
    }
}

/// Captures `length` seconds of frames, then loops each bin through the
/// capture at its own speed.
///
/// Speeds span `low..high` according to a [`SpeedDistribution`] and are
/// recomputed whenever either bound or the distribution changes.
#[derive(Debug, Clone)]
pub struct PvBufLoops {
    follower: FrameFollower,
    sample_rate: f32,
    low: Control,
    high: Control,
    distribution: SpeedDistribution,
    length: f32,
    rng: StdRng,
    speeds: Vec<f32>,
    /// Bounds and distribution the current speeds were computed for.
    speed_key: Option<(f32, f32, SpeedDistribution)>,
    looper: FrameLoop,
}

impl PvBufLoops {
    /// `length` is the capture duration in seconds.
    pub fn new(
        input: &SpectralFrameStream,
        sample_rate: u32,
        low: impl Into<Control>,
        high: impl Into<Control>,
        distribution: SpeedDistribution,
        length: f32,
    ) -> Result<Self, PvocError> {
        let sample_rate = checked_sample_rate(sample_rate)?;
        check_duration("loop length", length)?;
        let shape = input.shape();
        Ok(Self {
            follower: FrameFollower::new(shape),
            sample_rate,
            low: low.into(),
            high: high.into(),
            distribution,
            length,
            rng: StdRng::from_entropy(),
            speeds: vec![0.0; shape.bins()],
            speed_key: None,
            looper: FrameLoop::new(frames_for(length, sample_rate, shape), shape.bins()),
        })
    }

    /// Seeds the random distributions.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self.speed_key = None;
        self
    }

    /// Slowest loop speed, in passes through the capture per frame count.
    pub fn set_low(&mut self, low: impl Into<Control>) {
        self.low = low.into();
    }

    pub fn set_high(&mut self, high: impl Into<Control>) {
        self.high = high.into();
    }

    pub fn set_distribution(&mut self, distribution: SpeedDistribution) {
        self.distribution = distribution;
    }

    /// Changes the capture length and starts a new capture.
    pub fn set_length(&mut self, length: f32) -> Result<(), PvocError> {
        check_duration("loop length", length)?;
        self.length = length;
        self.allocate();
        Ok(())
    }

    /// Frames in a complete capture.
    pub fn frames(&self) -> usize {
        self.looper.recording.capacity()
    }

    pub fn is_capturing(&self) -> bool {
        !self.looper.is_full()
    }

    /// Current per-bin speeds.
    pub fn speeds(&self) -> &[f32] {
        &self.speeds
    }

    /// Moves every read pointer back to the start of the capture.
    pub fn reset_pointers(&mut self) {
        self.looper.rewind();
    }

    fn allocate(&mut self) {
        let shape = self.follower.shape();
        let frames = frames_for(self.length, self.sample_rate, shape);
        self.looper = FrameLoop::new(frames, shape.bins());
        self.speeds.clear();
        self.speeds.resize(shape.bins(), 0.0);
        self.speed_key = None;
    }
}

fn compute_speeds(
    speeds: &mut [f32],
    low: f32,
    high: f32,
    distribution: SpeedDistribution,
    rng: &mut StdRng,
) {
    let bins = speeds.len();
    for (k, speed) in speeds.iter_mut().enumerate() {
        *speed = low + (high - low) * distribution.position(k, bins, rng);
    }
}

impl SpectralEffect for PvBufLoops {
    fn process(&mut self, input: &SpectralFrameStream) {
        if self.follower.sync(input) {
            self.allocate();
        }
        let Self {
            follower,
            low,
            high,
            distribution,
            rng,
            speeds,
            speed_key,
            looper,
            ..
        } = self;
        let distribution = *distribution;
        follower.run(input, |i, slot, magnitude, frequency| {
            let key = (low.at(i), high.at(i), distribution);
            if *speed_key != Some(key) {
                compute_speeds(speeds, key.0, key.1, distribution, rng);
                *speed_key = Some(key);
            }
            let (in_mag, in_freq) = input.slot(slot);
            if looper.is_full() {
                looper.play(|k| speeds[k], magnitude, frequency);
            } else {
                looper.capture(in_mag, in_freq, magnitude, frequency);
            }
        });
    }

    fn output(&self) -> &SpectralFrameStream {
        self.follower.output()
    }

    fn reset(&mut self) {
        self.follower.rewind();
        self.looper.clear();
        self.speed_key = None;
    }
}

/// [`PvBufLoops`] with per-bin speeds read from a table.
///
/// Bin `k` loops at `table[k]`; bins past the end of the table hold still.
#[derive(Debug, Clone)]
pub struct PvBufTabLoops {
    follower: FrameFollower,
    sample_rate: f32,
    speeds: LookupTable,
    length: f32,
    looper: FrameLoop,
}

impl PvBufTabLoops {
    pub fn new(
        input: &SpectralFrameStream,
        sample_rate: u32,
        speeds: LookupTable,
        length: f32,
    ) -> Result<Self, PvocError> {
        let sample_rate = checked_sample_rate(sample_rate)?;
        check_duration("loop length", length)?;
        let shape = input.shape();
        Ok(Self {
            follower: FrameFollower::new(shape),
            sample_rate,
            speeds,
            length,
            looper: FrameLoop::new(frames_for(length, sample_rate, shape), shape.bins()),
        })
    }

    pub fn set_speeds(&mut self, speeds: LookupTable) {
        self.speeds = speeds;
    }

    /// Changes the capture length and starts a new capture.
    pub fn set_length(&mut self, length: f32) -> Result<(), PvocError> {
        check_duration("loop length", length)?;
        self.length = length;
        self.allocate();
        Ok(())
    }

    pub fn frames(&self) -> usize {
        self.looper.recording.capacity()
    }

    pub fn is_capturing(&self) -> bool {
        !self.looper.is_full()
    }

    pub fn reset_pointers(&mut self) {
        self.looper.rewind();
    }

    fn allocate(&mut self) {
        let shape = self.follower.shape();
        let frames = frames_for(self.length, self.sample_rate, shape);
        self.looper = FrameLoop::new(frames, shape.bins());
    }
}

impl SpectralEffect for PvBufTabLoops {
    fn process(&mut self, input: &SpectralFrameStream) {
        if self.follower.sync(input) {
            self.allocate();
        }
        let Self {
            follower,
            speeds,
            looper,
            ..
        } = self;
        let table = speeds.data();
        follower.run(input, |_, slot, magnitude, frequency| {
            let (in_mag, in_freq) = input.slot(slot);
            if looper.is_full() {
                looper.play(|k| bin_or_zero(table, k), magnitude, frequency);
            } else {
                looper.capture(in_mag, in_freq, magnitude, frequency);
            }
        });
    }

    fn output(&self) -> &SpectralFrameStream {
        self.follower.output()
    }

    fn reset(&mut self) {
        self.follower.rewind();
        self.looper.clear();
    }
}
