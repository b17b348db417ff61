//! One-shot frame capture with indexed, transposed playback.

use crate::core::control::Control;
use crate::core::ring_buffer::FrameRing;
use crate::core::types::{checked_sample_rate, FrameShape};
use crate::error::PvocError;
use crate::stream::SpectralFrameStream;

use super::delay::check_duration;
use super::{accumulate_bin, FrameFollower, SpectralEffect};

/// Number of frames covering `length` seconds at `shape`'s hop.
pub(crate) fn frames_for(length: f32, sample_rate: f32, shape: FrameShape) -> usize {
    ((length * sample_rate / shape.hop_size() as f32).round() as usize).max(1)
}

/// Records incoming frames until its ring is full, then plays back the
/// frame selected by `index`.
///
/// During capture the input passes through unchanged. On playback `index`
/// in `[0, 1)` selects a frame across the recording, and bins are moved to
/// `floor(k * pitch)` with frequencies scaled by `pitch`.
#[derive(Debug, Clone)]
pub struct PvBuffer {
    follower: FrameFollower,
    sample_rate: f32,
    index: Control,
    pitch: Control,
    length: f32,
    recording: FrameRing,
}

impl PvBuffer {
    /// `length` is the capture duration in seconds.
    pub fn new(
        input: &SpectralFrameStream,
        sample_rate: u32,
        index: impl Into<Control>,
        pitch: impl Into<Control>,
        length: f32,
    ) -> Result<Self, PvocError> {
        let sample_rate = checked_sample_rate(sample_rate)?;
        check_duration("buffer length", length)?;
        let shape = input.shape();
        Ok(Self {
            follower: FrameFollower::new(shape),
            sample_rate,
            index: index.into(),
            pitch: pitch.into(),
            length,
            recording: FrameRing::new(frames_for(length, sample_rate, shape), shape.bins()),
        })
    }

    pub fn set_index(&mut self, index: impl Into<Control>) {
        self.index = index.into();
    }

    pub fn set_pitch(&mut self, pitch: impl Into<Control>) {
        self.pitch = pitch.into();
    }

    /// Changes the capture length and starts a new capture.
    pub fn set_length(&mut self, length: f32) -> Result<(), PvocError> {
        check_duration("buffer length", length)?;
        self.length = length;
        self.allocate();
        Ok(())
    }

    /// Frames in a complete capture.
    pub fn frames(&self) -> usize {
        self.recording.capacity()
    }

    /// True while still recording.
    pub fn is_capturing(&self) -> bool {
        !self.recording.is_full()
    }

    /// Discards the capture and starts recording again.
    pub fn restart_capture(&mut self) {
        self.recording.clear();
    }

    fn allocate(&mut self) {
        let shape = self.follower.shape();
        let frames = frames_for(self.length, self.sample_rate, shape);
        self.recording = FrameRing::new(frames, shape.bins());
    }
}

impl SpectralEffect for PvBuffer {
    fn process(&mut self, input: &SpectralFrameStream) {
        if self.follower.sync(input) {
            self.allocate();
        }
        let Self {
            follower,
            index,
            pitch,
            recording,
            ..
        } = self;
        follower.run(input, |i, slot, magnitude, frequency| {
            let (in_mag, in_freq) = input.slot(slot);
            if !recording.is_full() {
                recording.push(in_mag, in_freq);
                magnitude.copy_from_slice(in_mag);
                frequency.copy_from_slice(in_freq);
                return;
            }
            let frames = recording.capacity();
            let position = (index.at(i) * frames as f32).max(0.0) as usize;
            let stored = recording.frame(position.min(frames - 1));
            let pitch = pitch.at(i);
            magnitude.fill(0.0);
            frequency.fill(0.0);
            for k in 0..magnitude.len() {
                let dest = (k as f32 * pitch).floor() as i64;
                accumulate_bin(
                    magnitude,
                    frequency,
                    dest,
                    stored.magnitude[k],
                    stored.frequency[k] * pitch,
                );
            }
        });
    }

    fn output(&self) -> &SpectralFrameStream {
        self.follower.output()
    }

    fn reset(&mut self) {
        self.follower.rewind();
        self.recording.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::testing::*;

    const SHAPE: FrameShape = FrameShape::new(16, 1);

    /// Buffer of 4 frames at hop 16, 16 kHz.
    fn buffer(index: f32, pitch: f32) -> (SpectralFrameStream, PvBuffer) {
        let input = SpectralFrameStream::new(SHAPE);
        let op = PvBuffer::new(&input, 16000, index, pitch, 0.004).unwrap();
        (input, op)
    }

    fn feed(input: &mut SpectralFrameStream, op: &mut PvBuffer, level: f32) {
        input.publish_slot(0, &[level; 8], &[level * 100.0; 8]);
        tick(input);
        op.process(input);
    }

    #[test]
    fn test_capture_passes_through_then_plays_back() {
        let (mut input, mut op) = buffer(0.5, 1.0);
        assert_eq!(op.frames(), 4);
        for level in 1..=4 {
            feed(&mut input, &mut op, level as f32);
            assert_eq!(op.output().magnitude(0)[0], level as f32);
        }
        assert!(!op.is_capturing());
        feed(&mut input, &mut op, 9.0);
        // index 0.5 of 4 frames is the third recorded frame
        assert_eq!(op.output().magnitude(0)[0], 3.0);
        assert_eq!(op.output().frequency(0)[0], 300.0);
    }

    #[test]
    fn test_index_is_clamped() {
        let (mut input, mut op) = buffer(1.5, 1.0);
        for level in 1..=4 {
            feed(&mut input, &mut op, level as f32);
        }
        feed(&mut input, &mut op, 0.0);
        assert_eq!(op.output().magnitude(0)[0], 4.0);
        op.set_index(-1.0);
        feed(&mut input, &mut op, 0.0);
        assert_eq!(op.output().magnitude(0)[0], 1.0);
    }

    #[test]
    fn test_playback_pitch_remaps_bins() {
        let (mut input, mut op) = buffer(0.0, 2.0);
        for _ in 0..4 {
            feed(&mut input, &mut op, 1.0);
        }
        feed(&mut input, &mut op, 0.0);
        let mag = op.output().magnitude(0);
        assert_eq!(mag, &[1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0]);
        assert_eq!(op.output().frequency(0)[2], 200.0);
    }

    #[test]
    fn test_restart_capture() {
        let (mut input, mut op) = buffer(0.0, 1.0);
        for _ in 0..4 {
            feed(&mut input, &mut op, 1.0);
        }
        op.restart_capture();
        assert!(op.is_capturing());
        feed(&mut input, &mut op, 7.0);
        assert_eq!(op.output().magnitude(0)[0], 7.0);
    }
}
