//! Operator parameters that are either constant or vary per sample.

/// A scalar parameter: a constant, or one value per sample of the current
/// block.
///
/// Operators sample a control at the block index where a frame becomes
/// ready, so both forms go through the same per-bin code.
#[derive(Debug, Clone, PartialEq)]
pub enum Control {
    Fixed(f32),
    Signal(Vec<f32>),
}

impl Control {
    /// Value at sample `i` of the current block.
    ///
    /// A signal shorter than the block holds its last value; an empty
    /// signal reads as 0.
    #[inline]
    pub fn at(&self, i: usize) -> f32 {
        match self {
            Control::Fixed(v) => *v,
            Control::Signal(block) => block
                .get(i)
                .or_else(|| block.last())
                .copied()
                .unwrap_or(0.0),
        }
    }

    /// Returns true for a per-sample control.
    #[inline]
    pub fn is_signal(&self) -> bool {
        matches!(self, Control::Signal(_))
    }

    /// Replaces the current block of a signal control, reusing its
    /// allocation. A fixed control becomes a signal.
    pub fn set_block(&mut self, block: &[f32]) {
        match self {
            Control::Signal(buf) => {
                buf.clear();
                buf.extend_from_slice(block);
            }
            Control::Fixed(_) => *self = Control::Signal(block.to_vec()),
        }
    }
}

impl Default for Control {
    fn default() -> Self {
        Control::Fixed(0.0)
    }
}

impl From<f32> for Control {
    fn from(value: f32) -> Self {
        Control::Fixed(value)
    }
}

impl From<Vec<f32>> for Control {
    fn from(block: Vec<f32>) -> Self {
        Control::Signal(block)
    }
}
