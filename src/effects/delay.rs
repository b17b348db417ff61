//! Per-bin spectral delay with feedback.

use crate::core::ring_buffer::FrameRing;
use crate::core::table::LookupTable;
use crate::core::types::checked_sample_rate;
use crate::error::PvocError;
use crate::stream::SpectralFrameStream;

use super::{FrameFollower, SpectralEffect};

/// Delays each bin by a whole number of analysis frames.
///
/// The delay table gives frames per bin (truncated, clamped to
/// `[1, max frames]`) and the feedback table a gain per bin in `[-1, 1]`.
/// The output is the delayed frame; the history receives the input plus
/// the delayed value times feedback.
#[derive(Debug, Clone)]
pub struct PvDelay {
    follower: FrameFollower,
    sample_rate: f32,
    delays: LookupTable,
    feedback: LookupTable,
    max_delay: f32,
    history: FrameRing,
}

impl PvDelay {
    /// `max_delay` is in seconds.
    pub fn new(
        input: &SpectralFrameStream,
        sample_rate: u32,
        delays: LookupTable,
        feedback: LookupTable,
        max_delay: f32,
    ) -> Result<Self, PvocError> {
        let sample_rate = checked_sample_rate(sample_rate)?;
        check_duration("max delay", max_delay)?;
        let mut delay = Self {
            follower: FrameFollower::new(input.shape()),
            sample_rate,
            delays,
            feedback,
            max_delay,
            history: FrameRing::new(1, 0),
        };
        delay.allocate_history();
        Ok(delay)
    }

    /// Frames of history held.
    pub fn max_frames(&self) -> usize {
        self.history.capacity()
    }

    pub fn set_delays(&mut self, delays: LookupTable) {
        self.delays = delays;
    }

    pub fn set_feedback(&mut self, feedback: LookupTable) {
        self.feedback = feedback;
    }

    /// Changes the history length. Discards the history.
    pub fn set_max_delay(&mut self, max_delay: f32) -> Result<(), PvocError> {
        check_duration("max delay", max_delay)?;
        self.max_delay = max_delay;
        self.allocate_history();
        Ok(())
    }

    fn allocate_history(&mut self) {
        let shape = self.follower.shape();
        let frames = (self.max_delay * self.sample_rate / shape.hop_size() as f32).round() as usize;
        self.history = FrameRing::new(frames.max(1), shape.bins());
    }
}

/// Rejects non-finite or non-positive durations.
pub(crate) fn check_duration(what: &str, seconds: f32) -> Result<(), PvocError> {
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(PvocError::InvalidParameter(format!(
            "{} must be a positive number of seconds, got {}",
            what, seconds
        )));
    }
    Ok(())
}

impl SpectralEffect for PvDelay {
    fn process(&mut self, input: &SpectralFrameStream) {
        if self.follower.sync(input) {
            self.allocate_history();
        }
        let Self {
            follower,
            delays,
            feedback,
            history,
            ..
        } = self;
        let max_frames = history.capacity();
        follower.run(input, |_, slot, magnitude, frequency| {
            let (in_mag, in_freq) = input.slot(slot);
            for k in 0..in_mag.len() {
                let d = (delays.get(k).max(0.0) as usize).clamp(1, max_frames);
                let fb = feedback.get(k).clamp(-1.0, 1.0);
                let (delayed_mag, delayed_freq) = history.read_back(d, k);
                magnitude[k] = delayed_mag;
                frequency[k] = delayed_freq;
                let fed_back = delayed_mag * fb;
                let freq = if in_mag[k] >= fed_back.abs() {
                    in_freq[k]
                } else {
                    delayed_freq
                };
                history.write_bin(k, in_mag[k] + fed_back, freq);
            }
            history.commit();
        });
    }

    fn output(&self) -> &SpectralFrameStream {
        self.follower.output()
    }

    fn reset(&mut self) {
        self.follower.rewind();
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::FrameShape;
    use crate::effects::testing::*;

    const SHAPE: FrameShape = FrameShape::new(16, 1);

    fn delay(frames: f32, feedback: f32) -> (SpectralFrameStream, PvDelay) {
        let input = SpectralFrameStream::new(SHAPE);
        // hop 16 at 16 kHz: 1 frame per ms
        let op = PvDelay::new(
            &input,
            16000,
            LookupTable::constant(8, frames),
            LookupTable::constant(8, feedback),
            0.008,
        )
        .unwrap();
        (input, op)
    }

    #[test]
    fn test_history_length_from_max_delay() {
        let (_, op) = delay(1.0, 0.0);
        assert_eq!(op.max_frames(), 8);
    }

    #[test]
    fn test_impulse_reappears_after_delay() {
        let (mut input, mut op) = delay(3.0, 0.0);
        let mut seen = Vec::new();
        for frame in 0..8 {
            let mag = if frame == 0 { [1.0; 8] } else { [0.0; 8] };
            input.publish_slot(0, &mag, &[500.0; 8]);
            tick(&mut input);
            op.process(&input);
            seen.push(op.output().magnitude(0)[5]);
        }
        assert_eq!(seen, vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_feedback_repeats_with_decay() {
        let (mut input, mut op) = delay(2.0, 0.5);
        let mut seen = Vec::new();
        for frame in 0..7 {
            let mag = if frame == 0 { [1.0; 8] } else { [0.0; 8] };
            input.publish_slot(0, &mag, &[500.0; 8]);
            tick(&mut input);
            op.process(&input);
            seen.push(op.output().magnitude(0)[0]);
        }
        assert_eq!(seen, vec![0.0, 0.0, 1.0, 0.0, 0.5, 0.0, 0.25]);
    }

    #[test]
    fn test_delay_clamped_to_history() {
        let (mut input, mut op) = delay(100.0, 0.0);
        let mut first = None;
        for frame in 0..10 {
            let mag = if frame == 0 { [1.0; 8] } else { [0.0; 8] };
            input.publish_slot(0, &mag, &[0.0; 8]);
            tick(&mut input);
            op.process(&input);
            if first.is_none() && op.output().magnitude(0)[0] > 0.0 {
                first = Some(frame);
            }
        }
        assert_eq!(first, Some(8));
    }

    #[test]
    fn test_invalid_max_delay() {
        let input = SpectralFrameStream::new(SHAPE);
        let table = LookupTable::constant(8, 1.0);
        assert!(PvDelay::new(&input, 44100, table.clone(), table.clone(), 0.0).is_err());
        assert!(PvDelay::new(&input, 44100, table.clone(), table, f32::NAN).is_err());
    }

    #[test]
    fn test_history_dropped_on_reconfigure() {
        let (mut input, mut op) = delay(1.0, 0.0);
        input.publish_slot(0, &[1.0; 8], &[0.0; 8]);
        tick(&mut input);
        op.process(&input);
        input.configure(32, 1);
        tick(&mut input);
        op.process(&input);
        assert!(op.output().magnitude(0).iter().all(|&m| m == 0.0));
        // hop 32 at 16 kHz, 8 ms
        assert_eq!(op.max_frames(), 4);
    }
}
