//! The shared magnitude/frequency bus between phase-vocoder nodes.

use crate::core::types::FrameShape;

/// Per-slot spectral frames plus the per-sample progress counter.
///
/// A stream is owned by the node that produces it; consumers borrow it for
/// the duration of their own `process` call and never mutate it. The
/// producer rewrites it once per tick before any consumer runs.
///
/// `magnitude` and `frequency` hold `overlaps` slots of `bins` values each.
/// Frequencies are in Hz. `progress[i]` is the position sample `i` of the
/// current block occupies in the producer's window; a value of
/// `fft_size - 1` marks the sample at which a new slot became ready.
#[derive(Debug, Clone)]
pub struct SpectralFrameStream {
    shape: FrameShape,
    magnitude: Vec<f32>,
    frequency: Vec<f32>,
    progress: Vec<usize>,
}

impl SpectralFrameStream {
    /// Allocates a zeroed stream for an already-normalized shape.
    pub fn new(shape: FrameShape) -> Self {
        let cells = shape.overlaps * shape.bins();
        Self {
            shape,
            magnitude: vec![0.0; cells],
            frequency: vec![0.0; cells],
            progress: Vec::new(),
        }
    }

    /// Reallocates for a new size/overlap pair and zeroes every cell.
    ///
    /// Non-power-of-two requests are rounded up (with a warning); the
    /// effective shape is returned.
    pub fn configure(&mut self, fft_size: usize, overlaps: usize) -> FrameShape {
        let shape = FrameShape::normalized(fft_size, overlaps);
        self.reshape(shape);
        shape
    }

    /// Reallocates for `shape` as given and zeroes every cell.
    pub(crate) fn reshape(&mut self, shape: FrameShape) {
        let cells = shape.overlaps * shape.bins();
        self.shape = shape;
        self.magnitude.clear();
        self.magnitude.resize(cells, 0.0);
        self.frequency.clear();
        self.frequency.resize(cells, 0.0);
    }

    #[inline]
    pub fn shape(&self) -> FrameShape {
        self.shape
    }

    #[inline]
    pub fn fft_size(&self) -> usize {
        self.shape.fft_size
    }

    #[inline]
    pub fn overlaps(&self) -> usize {
        self.shape.overlaps
    }

    #[inline]
    pub fn hop_size(&self) -> usize {
        self.shape.hop_size()
    }

    #[inline]
    pub fn bins(&self) -> usize {
        self.shape.bins()
    }

    #[inline]
    fn range(&self, slot: usize) -> std::ops::Range<usize> {
        let bins = self.shape.bins();
        let start = (slot % self.shape.overlaps) * bins;
        start..start + bins
    }

    /// Magnitudes of `slot`.
    #[inline]
    pub fn magnitude(&self, slot: usize) -> &[f32] {
        &self.magnitude[self.range(slot)]
    }

    /// Frequencies (Hz) of `slot`.
    #[inline]
    pub fn frequency(&self, slot: usize) -> &[f32] {
        &self.frequency[self.range(slot)]
    }

    /// Both vectors of `slot`.
    #[inline]
    pub fn slot(&self, slot: usize) -> (&[f32], &[f32]) {
        let range = self.range(slot);
        (&self.magnitude[range.clone()], &self.frequency[range])
    }

    /// Mutable vectors of `slot`, for producers writing in place.
    #[inline]
    pub fn slot_mut(&mut self, slot: usize) -> (&mut [f32], &mut [f32]) {
        let range = self.range(slot);
        (&mut self.magnitude[range.clone()], &mut self.frequency[range])
    }

    /// Copies a complete frame into `slot`.
    pub fn publish_slot(&mut self, slot: usize, magnitude: &[f32], frequency: &[f32]) {
        let (mag, freq) = self.slot_mut(slot);
        mag.copy_from_slice(magnitude);
        freq.copy_from_slice(frequency);
    }

    /// Window position of sample `i` in the current block.
    #[inline]
    pub fn progress(&self, i: usize) -> usize {
        self.progress[i]
    }

    /// Window positions for the whole current block.
    #[inline]
    pub fn progress_block(&self) -> &[usize] {
        &self.progress
    }

    /// Samples in the current block.
    #[inline]
    pub fn block_len(&self) -> usize {
        self.progress.len()
    }

    /// True when sample `i` completed a new slot.
    #[inline]
    pub fn frame_ready(&self, i: usize) -> bool {
        self.progress[i] >= self.shape.fft_size - 1
    }

    /// Starts a new block of `len` samples, all at progress 0.
    pub fn begin_block(&mut self, len: usize) {
        self.progress.clear();
        self.progress.resize(len, 0);
    }

    /// Records the window position of sample `i`.
    #[inline]
    pub fn set_progress(&mut self, i: usize, position: usize) {
        self.progress[i] = position;
    }

    /// Copies the progress counter of `upstream` for the current block.
    pub fn follow_progress(&mut self, upstream: &SpectralFrameStream) {
        self.progress.clear();
        self.progress.extend_from_slice(upstream.progress_block());
    }
}
