//! Fixed-capacity circular buffers for the real-time paths.
//!
//! [`RingBuffer`] is a capacity + head ring where logical index 0 is always
//! the oldest element. It backs the analyzer's sliding input window and the
//! resynthesis overlap-add accumulator. [`FrameRing`] layers a history of
//! spectral frames on top of it for the delay and buffer operators.

/// Fixed-capacity ring addressed from the oldest element.
///
/// The buffer never allocates after construction and never shifts memory.
#[derive(Debug, Clone)]
pub struct RingBuffer<T>
where
    T: Clone,
{
    data: Vec<T>,
    head: usize,
}

impl<T> RingBuffer<T>
where
    T: Clone,
{
    /// Creates a ring of `cap` copies of `value`.
    pub fn from_elem(cap: usize, value: T) -> Self {
        Self {
            data: vec![value; cap],
            head: 0,
        }
    }

    /// Returns the fixed capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Physical position of logical index `i`.
    #[inline]
    fn physical(&self, i: usize) -> usize {
        (self.head + i) % self.data.len()
    }

    /// Element at logical index `i` (0 = oldest).
    #[inline]
    pub fn get(&self, i: usize) -> &T {
        &self.data[self.physical(i)]
    }

    /// Mutable element at logical index `i` (0 = oldest).
    #[inline]
    pub fn get_mut(&mut self, i: usize) -> &mut T {
        let p = self.physical(i);
        &mut self.data[p]
    }

    /// Element written `d` pushes ago (`d = 1` is the newest,
    /// `d = capacity` the oldest).
    #[inline]
    pub fn back(&self, d: usize) -> &T {
        debug_assert!(d >= 1 && d <= self.capacity());
        self.get(self.capacity() - d)
    }

    /// Overwrites the oldest element with `value`, making it the newest.
    ///
    /// Returns the evicted element.
    #[inline]
    pub fn push_overwrite(&mut self, value: T) -> T {
        let evicted = std::mem::replace(&mut self.data[self.head], value);
        self.head = (self.head + 1) % self.data.len();
        evicted
    }

    /// Moves the head forward by `n`: the `n` oldest elements become the
    /// newest without being modified.
    #[inline]
    pub fn rotate(&mut self, n: usize) {
        if !self.data.is_empty() {
            self.head = (self.head + n) % self.data.len();
        }
    }

    /// Resets every element to `value` and the head to 0.
    pub fn fill(&mut self, value: T) {
        for slot in self.data.iter_mut() {
            *slot = value.clone();
        }
        self.head = 0;
    }
}

impl<T> RingBuffer<T>
where
    T: Copy + Default,
{
    /// Creates a ring of `cap` default values.
    pub fn with_capacity(cap: usize) -> Self {
        Self::from_elem(cap, T::default())
    }

    /// Copies the contents into `out`, oldest first.
    ///
    /// Returns the number of copied elements.
    pub fn copy_to_slice(&self, out: &mut [T]) -> usize {
        let to_copy = out.len().min(self.capacity());
        if to_copy == 0 {
            return 0;
        }
        let first = to_copy.min(self.capacity() - self.head);
        out[..first].copy_from_slice(&self.data[self.head..self.head + first]);
        let second = to_copy - first;
        if second > 0 {
            out[first..first + second].copy_from_slice(&self.data[..second]);
        }
        to_copy
    }

    /// Resets the `n` oldest elements to default and rotates them to the
    /// newest positions.
    pub fn advance_clearing(&mut self, n: usize) {
        let n = n.min(self.capacity());
        for i in 0..n {
            *self.get_mut(i) = T::default();
        }
        self.rotate(n);
    }

    /// Resets every element to default and the head to 0.
    pub fn clear(&mut self) {
        self.fill(T::default());
    }
}

/// Magnitude/frequency vectors for one stored frame.
#[derive(Debug, Clone, Default)]
pub struct BinFrame {
    pub magnitude: Vec<f32>,
    pub frequency: Vec<f32>,
}

impl BinFrame {
    fn zeroed(bins: usize) -> Self {
        Self {
            magnitude: vec![0.0; bins],
            frequency: vec![0.0; bins],
        }
    }
}

/// History of spectral frames with a write cursor.
///
/// Frames are written bin by bin into the slot at the cursor
/// ([`write_bin`](FrameRing::write_bin)) and made visible with
/// [`commit`](FrameRing::commit).
#[derive(Debug, Clone)]
pub struct FrameRing {
    frames: RingBuffer<BinFrame>,
    bins: usize,
    recorded: usize,
}

impl FrameRing {
    /// Allocates `frames` zeroed frames of `bins` bins each.
    pub fn new(frames: usize, bins: usize) -> Self {
        let frames = frames.max(1);
        Self {
            frames: RingBuffer::from_elem(frames, BinFrame::zeroed(bins)),
            bins,
            recorded: 0,
        }
    }

    /// Number of frames the ring holds.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.frames.capacity()
    }

    /// Bins per frame.
    #[inline]
    pub fn bins(&self) -> usize {
        self.bins
    }

    /// Frames committed since the last clear, saturating at capacity.
    #[inline]
    pub fn recorded(&self) -> usize {
        self.recorded
    }

    /// True once every slot has been written at least once.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.recorded >= self.capacity()
    }

    /// Magnitude/frequency at `bin` of the frame committed `d` frames ago.
    ///
    /// `d` must lie in `[1, capacity]`; `d = capacity` addresses the slot
    /// under the write cursor, which still holds its previous contents until
    /// overwritten.
    #[inline]
    pub fn read_back(&self, d: usize, bin: usize) -> (f32, f32) {
        let frame = self.frames.back(d);
        (frame.magnitude[bin], frame.frequency[bin])
    }

    /// Writes one bin of the frame under the cursor.
    #[inline]
    pub fn write_bin(&mut self, bin: usize, magnitude: f32, frequency: f32) {
        let frame = self.frames.get_mut(0);
        frame.magnitude[bin] = magnitude;
        frame.frequency[bin] = frequency;
    }

    /// Copies a whole frame under the cursor and commits it.
    pub fn push(&mut self, magnitude: &[f32], frequency: &[f32]) {
        let frame = self.frames.get_mut(0);
        frame.magnitude.copy_from_slice(magnitude);
        frame.frequency.copy_from_slice(frequency);
        self.commit();
    }

    /// Advances the cursor past the frame just written.
    #[inline]
    pub fn commit(&mut self) {
        self.frames.rotate(1);
        self.recorded = (self.recorded + 1).min(self.capacity());
    }

    /// Frame at recording position `index`, counted from the oldest slot.
    ///
    /// After exactly `capacity` commits from a cleared ring this is the
    /// `index`-th recorded frame.
    #[inline]
    pub fn frame(&self, index: usize) -> &BinFrame {
        self.frames.get(index.min(self.capacity() - 1))
    }

    /// Zeroes every frame and rewinds the cursor.
    pub fn clear(&mut self) {
        self.frames.fill(BinFrame::zeroed(self.bins));
        self.recorded = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_overwrite_slides_window() {
        let mut rb = RingBuffer::<i32>::with_capacity(4);
        for v in 1..=6 {
            rb.push_overwrite(v);
        }
        let mut out = [0; 4];
        assert_eq!(rb.copy_to_slice(&mut out), 4);
        assert_eq!(out, [3, 4, 5, 6]);
        assert_eq!(*rb.back(1), 6);
        assert_eq!(*rb.back(4), 3);
    }

    #[test]
    fn test_push_overwrite_returns_evicted() {
        let mut rb = RingBuffer::<i32>::with_capacity(2);
        assert_eq!(rb.push_overwrite(1), 0);
        assert_eq!(rb.push_overwrite(2), 0);
        assert_eq!(rb.push_overwrite(3), 1);
    }

    #[test]
    fn test_advance_clearing_acts_as_accumulator() {
        let mut acc = RingBuffer::<f32>::with_capacity(4);
        for i in 0..4 {
            *acc.get_mut(i) += 1.0;
        }
        acc.advance_clearing(2);
        let mut out = [0.0; 4];
        acc.copy_to_slice(&mut out);
        assert_eq!(out, [1.0, 1.0, 0.0, 0.0]);
        for i in 0..4 {
            *acc.get_mut(i) += 1.0;
        }
        acc.copy_to_slice(&mut out);
        assert_eq!(out, [2.0, 2.0, 1.0, 1.0]);
    }

    #[test]
    fn test_clear_resets_head() {
        let mut rb = RingBuffer::<i32>::with_capacity(3);
        rb.push_overwrite(7);
        rb.clear();
        let mut out = [1; 3];
        rb.copy_to_slice(&mut out);
        assert_eq!(out, [0, 0, 0]);
        assert_eq!(*rb.get(0), 0);
    }

    #[test]
    fn test_frame_ring_read_back() {
        let mut ring = FrameRing::new(3, 2);
        ring.push(&[1.0, 1.5], &[10.0, 15.0]);
        ring.push(&[2.0, 2.5], &[20.0, 25.0]);
        assert_eq!(ring.read_back(1, 0), (2.0, 20.0));
        assert_eq!(ring.read_back(2, 1), (1.5, 15.0));
        // Oldest slot has not been written yet
        assert_eq!(ring.read_back(3, 0), (0.0, 0.0));
        assert!(!ring.is_full());
        ring.push(&[3.0, 3.5], &[30.0, 35.0]);
        assert!(ring.is_full());
        assert_eq!(ring.frame(0).magnitude, vec![1.0, 1.5]);
        assert_eq!(ring.frame(2).frequency, vec![30.0, 35.0]);
    }

    #[test]
    fn test_frame_ring_write_bin_then_commit() {
        let mut ring = FrameRing::new(2, 3);
        ring.write_bin(1, 4.0, 40.0);
        ring.commit();
        assert_eq!(ring.read_back(1, 1), (4.0, 40.0));
        assert_eq!(ring.recorded(), 1);
        ring.clear();
        assert_eq!(ring.recorded(), 0);
        assert_eq!(ring.read_back(1, 1), (0.0, 0.0));
    }
}
