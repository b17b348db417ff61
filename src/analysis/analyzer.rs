//! Streaming STFT analysis into magnitude/instantaneous-frequency frames.

use std::f32::consts::PI;

use crate::core::fft::RealFft;
use crate::core::ring_buffer::RingBuffer;
use crate::core::types::{FrameShape, PvocParams};
use crate::core::window::{generate_window, window_sum, WindowType};
use crate::error::PvocError;
use crate::stream::SpectralFrameStream;

const TWO_PI: f32 = 2.0 * PI;

/// Callback run with each newly published magnitude/frequency frame.
pub type FrameObserver = Box<dyn FnMut(&[f32], &[f32]) + Send>;

/// Maps a phase difference into `(-π, π]`.
#[inline]
pub fn unwrap_phase(mut diff: f32) -> f32 {
    if !diff.is_finite() {
        return 0.0;
    }
    if diff.abs() > 64.0 * PI {
        diff = diff.rem_euclid(TWO_PI);
    }
    while diff > PI {
        diff -= TWO_PI;
    }
    while diff <= -PI {
        diff += TWO_PI;
    }
    diff
}

/// Phase-vocoder analysis node.
///
/// Each incoming sample is pushed into a sliding window of `fft_size`
/// samples. Every `hop` samples the window is rotated by `hop * slot`,
/// windowed, transformed, and converted to magnitude plus instantaneous
/// frequency in Hz for slot `slot` of the output stream.
pub struct PvAnalyzer {
    sample_rate: f32,
    window_type: WindowType,
    shape: FrameShape,
    input: RingBuffer<f32>,
    /// Window position of the next sample.
    incount: usize,
    slot: usize,
    /// Phase of each bin in the previous frame, shared across slots.
    last_phase: Vec<f32>,
    window: Vec<f32>,
    /// `2 / Σw`, so a bin-centred sinusoid reports its amplitude.
    spectrum_scale: f32,
    fft: RealFft,
    frame: Vec<f32>,
    output: SpectralFrameStream,
    observer: Option<FrameObserver>,
}

impl PvAnalyzer {
    /// Creates an analyzer from validated parameters.
    pub fn new(params: &PvocParams) -> Result<Self, PvocError> {
        params.validate()?;
        let shape = params.shape();
        let window = generate_window(params.window, shape.fft_size);
        let spectrum_scale = 2.0 / window_sum(&window);
        Ok(Self {
            sample_rate: params.sample_rate as f32,
            window_type: params.window,
            shape,
            input: RingBuffer::with_capacity(shape.fft_size),
            incount: shape.input_latency(),
            slot: 0,
            last_phase: vec![0.0; shape.bins()],
            window,
            spectrum_scale,
            fft: RealFft::new(shape.fft_size),
            frame: vec![0.0; shape.fft_size],
            output: SpectralFrameStream::new(shape),
            observer: None,
        })
    }

    /// The published frame stream.
    #[inline]
    pub fn output(&self) -> &SpectralFrameStream {
        &self.output
    }

    /// Effective frame shape.
    #[inline]
    pub fn shape(&self) -> FrameShape {
        self.shape
    }

    #[inline]
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    #[inline]
    pub fn window_type(&self) -> WindowType {
        self.window_type
    }

    /// Samples carried over between frames (`fft_size - hop`).
    #[inline]
    pub fn latency(&self) -> usize {
        self.shape.input_latency()
    }

    /// Changes the transform length, returning the effective value.
    ///
    /// All buffers and the published stream are reallocated and zeroed.
    pub fn set_fft_size(&mut self, fft_size: usize) -> usize {
        let shape = FrameShape::normalized(fft_size, self.shape.overlaps);
        self.reallocate(shape);
        shape.fft_size
    }

    /// Changes the overlap count, returning the effective value.
    pub fn set_overlaps(&mut self, overlaps: usize) -> usize {
        let shape = FrameShape::normalized(self.shape.fft_size, overlaps);
        self.reallocate(shape);
        shape.overlaps
    }

    /// Changes the analysis window. Phase history is kept.
    pub fn set_window(&mut self, window_type: WindowType) {
        self.window_type = window_type;
        self.window = generate_window(window_type, self.shape.fft_size);
        self.spectrum_scale = 2.0 / window_sum(&self.window);
    }

    /// Installs a callback receiving every published frame.
    pub fn set_frame_observer(&mut self, observer: FrameObserver) {
        self.observer = Some(observer);
    }

    /// Removes the frame callback.
    pub fn clear_frame_observer(&mut self) {
        self.observer = None;
    }

    /// Clears input and phase history without changing the shape.
    pub fn reset(&mut self) {
        self.reallocate(self.shape);
    }

    fn reallocate(&mut self, shape: FrameShape) {
        log::debug!(
            "analyzer reallocating for fft_size={} overlaps={}",
            shape.fft_size,
            shape.overlaps
        );
        if shape.fft_size != self.shape.fft_size {
            self.window = generate_window(self.window_type, shape.fft_size);
            self.spectrum_scale = 2.0 / window_sum(&self.window);
            self.fft = RealFft::new(shape.fft_size);
            self.frame = vec![0.0; shape.fft_size];
            self.input = RingBuffer::with_capacity(shape.fft_size);
        } else {
            self.input.clear();
        }
        self.shape = shape;
        self.incount = shape.input_latency();
        self.slot = 0;
        self.last_phase.clear();
        self.last_phase.resize(shape.bins(), 0.0);
        self.output.reshape(shape);
    }

    /// Analyzes one block of samples.
    ///
    /// Rewrites the progress counter for the block and every slot that
    /// completes inside it.
    pub fn process(&mut self, input: &[f32]) {
        self.output.begin_block(input.len());
        for (i, &sample) in input.iter().enumerate() {
            self.input.push_overwrite(sample);
            self.output.set_progress(i, self.incount);
            self.incount += 1;
            if self.incount >= self.shape.fft_size {
                self.incount = self.shape.input_latency();
                self.analyze_frame();
            }
        }
    }

    fn analyze_frame(&mut self) {
        let n = self.shape.fft_size;
        let hop = self.shape.hop_size();
        let rotation = hop * self.slot;
        for k in 0..n {
            self.frame[(k + rotation) % n] = *self.input.get(k) * self.window[k];
        }
        self.fft.forward(&mut self.frame);

        let bin_advance = TWO_PI * hop as f32 / n as f32;
        let to_hz = self.sample_rate / (hop as f32 * TWO_PI);
        let scale = self.spectrum_scale;
        let (magnitude, frequency) = self.output.slot_mut(self.slot);
        for k in 0..magnitude.len() {
            let (re, im) = if k == 0 {
                (self.frame[0], 0.0)
            } else {
                (self.frame[k], self.frame[n - k])
            };
            let (re, im) = (re * scale, im * scale);
            let phase = im.atan2(re);
            let diff = unwrap_phase(phase - self.last_phase[k]);
            self.last_phase[k] = phase;
            magnitude[k] = (re * re + im * im).sqrt();
            frequency[k] = (diff + k as f32 * bin_advance) * to_hz;
        }
        if let Some(observer) = self.observer.as_mut() {
            observer(magnitude, frequency);
        }
        self.slot = (self.slot + 1) % self.shape.overlaps;
    }
}

impl std::fmt::Debug for PvAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PvAnalyzer")
            .field("sample_rate", &self.sample_rate)
            .field("window_type", &self.window_type)
            .field("shape", &self.shape)
            .field("slot", &self.slot)
            .finish()
    }
}
