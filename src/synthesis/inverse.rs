//! Inverse-FFT overlap-add resynthesis.

use std::f32::consts::PI;

use crate::analysis::unwrap_phase;
use crate::core::fft::RealFft;
use crate::core::ring_buffer::RingBuffer;
use crate::core::types::{checked_sample_rate, FrameShape};
use crate::core::window::{generate_window, window_energy, window_sum, WindowType};
use crate::error::PvocError;
use crate::stream::SpectralFrameStream;

/// Turns magnitude/frequency frames back into samples.
///
/// Frequencies are converted to per-frame phase increments relative to the
/// bin centre and accumulated per bin. The rebuilt frame is un-rotated,
/// windowed, and overlap-added; each completed hop is then played out
/// sample by sample following the upstream progress counter.
pub struct PvSynth {
    sample_rate: f32,
    window_type: WindowType,
    shape: FrameShape,
    slot: usize,
    sum_phase: Vec<f32>,
    window: Vec<f32>,
    /// `Σw·hop / (2·Σw²)`, undoing the analysis scaling and window overlap.
    amp_scale: f32,
    fft: RealFft,
    frame: Vec<f32>,
    accumulator: RingBuffer<f32>,
    /// Last completed hop.
    ready: Vec<f32>,
    output: Vec<f32>,
}

impl PvSynth {
    /// Creates a resynthesizer sized for `input`.
    pub fn new(
        input: &SpectralFrameStream,
        sample_rate: u32,
        window_type: WindowType,
    ) -> Result<Self, PvocError> {
        let sample_rate = checked_sample_rate(sample_rate)?;
        let shape = input.shape();
        let window = generate_window(window_type, shape.fft_size);
        Ok(Self {
            sample_rate,
            window_type,
            shape,
            slot: 0,
            sum_phase: vec![0.0; shape.bins()],
            amp_scale: overlap_add_scale(&window, shape.hop_size()),
            window,
            fft: RealFft::new(shape.fft_size),
            frame: vec![0.0; shape.fft_size],
            accumulator: RingBuffer::with_capacity(shape.fft_size),
            ready: vec![0.0; shape.hop_size()],
            output: Vec::new(),
        })
    }

    /// Delay from analyzer input to synthesized output, in samples.
    #[inline]
    pub fn latency(&self) -> usize {
        self.shape.fft_size
    }

    #[inline]
    pub fn shape(&self) -> FrameShape {
        self.shape
    }

    #[inline]
    pub fn window_type(&self) -> WindowType {
        self.window_type
    }

    /// Changes the synthesis window without touching the phase state.
    pub fn set_window(&mut self, window_type: WindowType) {
        self.window_type = window_type;
        self.window = generate_window(window_type, self.shape.fft_size);
        self.amp_scale = overlap_add_scale(&self.window, self.shape.hop_size());
    }

    /// Samples produced by the last call to [`process`](Self::process).
    #[inline]
    pub fn output(&self) -> &[f32] {
        &self.output
    }

    /// Clears phase and overlap-add state.
    pub fn reset(&mut self) {
        self.reallocate(self.shape);
    }

    fn reallocate(&mut self, shape: FrameShape) {
        log::debug!(
            "resynthesis reallocating for fft_size={} overlaps={}",
            shape.fft_size,
            shape.overlaps
        );
        if shape.fft_size != self.shape.fft_size {
            self.window = generate_window(self.window_type, shape.fft_size);
            self.fft = RealFft::new(shape.fft_size);
            self.frame = vec![0.0; shape.fft_size];
            self.accumulator = RingBuffer::with_capacity(shape.fft_size);
        } else {
            self.accumulator.clear();
        }
        self.amp_scale = overlap_add_scale(&self.window, shape.hop_size());
        self.shape = shape;
        self.slot = 0;
        self.sum_phase.clear();
        self.sum_phase.resize(shape.bins(), 0.0);
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
                self.synthesize_frame(input);
            }
        }
        &self.output
    }

    fn synthesize_frame(&mut self, input: &SpectralFrameStream) {
        let n = self.shape.fft_size;
        let hop = self.shape.hop_size();
        let bin_width = self.sample_rate / n as f32;
        let frame_scale = 2.0 * PI * hop as f32 / self.sample_rate;

        let (magnitude, frequency) = input.slot(self.slot);
        self.frame.fill(0.0);
        for k in 0..magnitude.len() {
            let incr = (frequency[k] - k as f32 * bin_width) * frame_scale;
            let phase = unwrap_phase(self.sum_phase[k] + incr);
            self.sum_phase[k] = phase;
            let real = magnitude[k] * phase.cos();
            if k == 0 {
                self.frame[0] = real;
            } else {
                self.frame[k] = real;
                self.frame[n - k] = magnitude[k] * phase.sin();
            }
        }
        self.fft.inverse(&mut self.frame);

        let rotation = hop * self.slot;
        for k in 0..n {
            let sample = self.frame[(k + rotation) % n] * self.window[k] * self.amp_scale;
            *self.accumulator.get_mut(k) += sample;
        }
        self.accumulator.copy_to_slice(&mut self.ready);
        self.accumulator.advance_clearing(hop);
        self.slot = (self.slot + 1) % self.shape.overlaps;
    }
}

/// Gain restoring unity level after analysis scaling, synthesis windowing,
/// and overlap-add at `hop`.
fn overlap_add_scale(window: &[f32], hop: usize) -> f32 {
    let energy = window_energy(window);
    if energy <= 0.0 {
        return 0.0;
    }
    window_sum(window) * hop as f32 / (2.0 * energy)
}

impl std::fmt::Debug for PvSynth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PvSynth")
            .field("sample_rate", &self.sample_rate)
            .field("window_type", &self.window_type)
            .field("shape", &self.shape)
            .field("slot", &self.slot)
            .finish()
    }
}
