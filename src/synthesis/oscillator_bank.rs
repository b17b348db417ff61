//! Additive resynthesis with a bank of table-lookup oscillators.

use crate::core::control::Control;
use crate::core::table::sine_table;
use crate::core::types::{checked_sample_rate, FrameShape};
use crate::error::PvocError;
use crate::stream::SpectralFrameStream;

/// Oscillator bank driven by a sparse subset of analysis bins.
///
/// Partial `i` follows bin `i * increment + first`. Partials whose bin
/// falls at or past `bins` stay silent. On every completed frame the
/// targets are read from the slot, and amplitude and frequency ramp
/// linearly from their previous values across the next hop.
#[derive(Debug)]
pub struct PvAddSynth {
    sample_rate: f32,
    shape: FrameShape,
    slot: usize,
    pitch: Control,
    num: usize,
    first: usize,
    increment: usize,
    /// Table read pointer per partial.
    pointer: Vec<f32>,
    amplitude: Vec<f32>,
    frequency: Vec<f32>,
    ready: Vec<f32>,
    output: Vec<f32>,
}

impl PvAddSynth {
    pub fn new(
        input: &SpectralFrameStream,
        sample_rate: u32,
        pitch: impl Into<Control>,
    ) -> Result<Self, PvocError> {
        let sample_rate = checked_sample_rate(sample_rate)?;
        let shape = input.shape();
        let mut synth = Self {
            sample_rate,
            shape,
            slot: 0,
            pitch: pitch.into(),
            num: 100,
            first: 0,
            increment: 1,
            pointer: Vec::new(),
            amplitude: Vec::new(),
            frequency: Vec::new(),
            ready: Vec::new(),
            output: Vec::new(),
        };
        synth.reallocate(shape);
        Ok(synth)
    }

    /// Number of partials.
    pub fn with_num(mut self, num: usize) -> Self {
        self.set_num(num);
        self
    }

    /// First bin followed.
    pub fn with_first(mut self, first: usize) -> Self {
        self.set_first(first);
        self
    }

    /// Bin step between partials.
    pub fn with_increment(mut self, increment: usize) -> Self {
        self.set_increment(increment);
        self
    }

    pub fn set_num(&mut self, num: usize) {
        self.num = num.max(1);
        self.reallocate(self.shape);
    }

    pub fn set_first(&mut self, first: usize) {
        self.first = first;
        self.reallocate(self.shape);
    }

    pub fn set_increment(&mut self, increment: usize) {
        self.increment = increment.max(1);
        self.reallocate(self.shape);
    }

    /// Transposition factor applied to every partial frequency.
    pub fn set_pitch(&mut self, pitch: impl Into<Control>) {
        self.pitch = pitch.into();
    }

    pub fn pitch_mut(&mut self) -> &mut Control {
        &mut self.pitch
    }

    #[inline]
    pub fn num(&self) -> usize {
        self.num
    }

    #[inline]
    pub fn first(&self) -> usize {
        self.first
    }

    #[inline]
    pub fn increment(&self) -> usize {
        self.increment
    }

    /// Delay from analyzer input to synthesized output, in samples.
    #[inline]
    pub fn latency(&self) -> usize {
        self.shape.fft_size
    }

    #[inline]
    pub fn output(&self) -> &[f32] {
        &self.output
    }

    pub fn reset(&mut self) {
        self.reallocate(self.shape);
    }

    fn reallocate(&mut self, shape: FrameShape) {
        if shape != self.shape {
            log::debug!(
                "oscillator bank reallocating for fft_size={} overlaps={}",
                shape.fft_size,
                shape.overlaps
            );
        }
        self.shape = shape;
        self.slot = 0;
        for state in [&mut self.pointer, &mut self.amplitude, &mut self.frequency] {
            state.clear();
            state.resize(self.num, 0.0);
        }
        self.ready.clear();
        self.ready.resize(shape.hop_size(), 0.0);
    }

    /// Synthesizes one block, as long as the upstream block.
    pub fn process(&mut self, input: &SpectralFrameStream) -> &[f32] {
        if input.shape() != self.shape {
            self.reallocate(input.shape());
        }
        let latency = self.shape.input_latency();
        let last = self.shape.hop_size() - 1;
        self.output.clear();
        for i in 0..input.block_len() {
            let pos = input.progress(i).saturating_sub(latency).min(last);
            self.output.push(self.ready[pos]);
            if input.frame_ready(i) {
                let pitch = self.pitch.at(i);
                self.synthesize_hop(input, pitch);
            }
        }
        &self.output
    }

    fn synthesize_hop(&mut self, input: &SpectralFrameStream, pitch: f32) {
        let table = sine_table();
        let table_len = table.len() as f32;
        let to_table = table_len / self.sample_rate;
        let hop = self.ready.len() as f32;
        let (magnitude, frequency) = input.slot(self.slot);

        self.ready.fill(0.0);
        for n in 0..self.num {
            let bin = n * self.increment + self.first;
            if bin >= magnitude.len() {
                break;
            }
            let target_amp = magnitude[bin];
            let target_freq = frequency[bin] * pitch;
            let mut amp = self.amplitude[n];
            let mut freq = self.frequency[n];
            let amp_step = (target_amp - amp) / hop;
            let freq_step = (target_freq - freq) / hop;
            let mut pointer = self.pointer[n];
            for sample in self.ready.iter_mut() {
                pointer = (pointer + freq * to_table).rem_euclid(table_len);
                *sample += amp * table.interpolate(pointer);
                amp += amp_step;
                freq += freq_step;
            }
            self.pointer[n] = pointer;
            self.amplitude[n] = target_amp;
            self.frequency[n] = target_freq;
        }
        self.slot = (self.slot + 1) % self.shape.overlaps;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready_stream(shape: FrameShape, bin: usize, mag: f32, freq: f32) -> SpectralFrameStream {
        let mut stream = SpectralFrameStream::new(shape);
        let mut m = vec![0.0; shape.bins()];
        let mut f = vec![0.0; shape.bins()];
        m[bin] = mag;
        f[bin] = freq;
        for slot in 0..shape.overlaps {
            stream.publish_slot(slot, &m, &f);
        }
        stream
    }

    fn drive(synth: &mut PvAddSynth, stream: &mut SpectralFrameStream, hops: usize) -> Vec<f32> {
        let shape = stream.shape();
        let hop = shape.hop_size();
        let mut out = Vec::new();
        for _ in 0..hops {
            stream.begin_block(hop);
            for i in 0..hop {
                stream.set_progress(i, shape.input_latency() + i);
            }
            out.extend_from_slice(synth.process(stream));
        }
        out
    }

    #[test]
    fn test_defaults() {
        let stream = SpectralFrameStream::new(FrameShape::default());
        let synth = PvAddSynth::new(&stream, 44100, 1.0).unwrap();
        assert_eq!(synth.num(), 100);
        assert_eq!(synth.first(), 0);
        assert_eq!(synth.increment(), 1);
        assert!(PvAddSynth::new(&stream, 0, 1.0).is_err());
    }

    #[test]
    fn test_single_partial_reaches_target_amplitude() {
        let shape = FrameShape::new(256, 4);
        let mut stream = ready_stream(shape, 4, 0.5, 1000.0);
        let mut synth = PvAddSynth::new(&stream, 44100, 1.0).unwrap();
        let out = drive(&mut synth, &mut stream, 40);
        let peak = out[out.len() - 256..]
            .iter()
            .fold(0.0f32, |acc, &s| acc.max(s.abs()));
        assert!((peak - 0.5).abs() < 0.02, "peak {}", peak);
    }

    #[test]
    fn test_bins_past_the_end_are_silent() {
        let shape = FrameShape::new(64, 2);
        let mut stream = ready_stream(shape, 31, 1.0, 500.0);
        let mut synth = PvAddSynth::new(&stream, 44100, 1.0)
            .unwrap()
            .with_first(32)
            .with_num(10);
        let out = drive(&mut synth, &mut stream, 8);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_zero_pitch_freezes_oscillators() {
        let shape = FrameShape::new(128, 2);
        let mut stream = ready_stream(shape, 2, 1.0, 700.0);
        let mut synth = PvAddSynth::new(&stream, 44100, 0.0).unwrap();
        let out = drive(&mut synth, &mut stream, 10);
        // Pointer never moves, and sin(0) = 0
        assert!(out.iter().all(|&s| s.abs() < 1e-6));
    }
}
