//! Lookup tables with linear interpolation.
//!
//! A table stores its nominal values plus one guard sample so that
//! interpolation at the last index never reads out of bounds. Envelope
//! tables repeat their last value as the guard; periodic waveforms repeat
//! their first.

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::sync::OnceLock;

use crate::error::PvocError;

/// Length of the shared oscillator sine table.
pub const SINE_TABLE_SIZE: usize = 8192;

/// Periodic modulation shapes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Waveform {
    #[default]
    Sine,
    /// Falling ramp, 1 to -1.
    Saw,
    /// Rising ramp, -1 to 1.
    Ramp,
    Square,
    Triangle,
}

impl Waveform {
    /// Maps the classic integer shape selector, clamping out-of-range values.
    pub fn from_index(index: usize) -> Self {
        const TABLE: [Waveform; 5] = [
            Waveform::Sine,
            Waveform::Saw,
            Waveform::Ramp,
            Waveform::Square,
            Waveform::Triangle,
        ];
        match TABLE.get(index) {
            Some(w) => *w,
            None => {
                log::warn!("waveform selector {} out of range, using triangle", index);
                Waveform::Triangle
            }
        }
    }

    /// Value at phase `x` in `[0, 1)`, bipolar in `[-1, 1]`.
    fn sample(self, x: f32) -> f32 {
        match self {
            Waveform::Sine => (2.0 * PI * x).sin(),
            Waveform::Saw => 1.0 - 2.0 * x,
            Waveform::Ramp => 2.0 * x - 1.0,
            Waveform::Square => {
                if x < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Triangle => {
                if x < 0.25 {
                    4.0 * x
                } else if x < 0.75 {
                    2.0 - 4.0 * x
                } else {
                    4.0 * x - 4.0
                }
            }
        }
    }
}

/// Float array with linear interpolation and a guard sample.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupTable {
    data: Vec<f32>,
}

impl LookupTable {
    /// Builds a table from envelope values. The last value is repeated as
    /// the guard sample.
    pub fn new(mut values: Vec<f32>) -> Result<Self, PvocError> {
        let guard = *values.last().ok_or(PvocError::EmptyTable("lookup"))?;
        values.push(guard);
        Ok(Self { data: values })
    }

    /// A table of `len` copies of `value`.
    pub fn constant(len: usize, value: f32) -> Self {
        Self {
            data: vec![value; len.max(1) + 1],
        }
    }

    /// One period of `shape` over `len` points, guard = first sample.
    pub fn waveform(shape: Waveform, len: usize) -> Self {
        let len = len.max(1);
        let mut data: Vec<f32> = (0..len)
            .map(|i| shape.sample(i as f32 / len as f32))
            .collect();
        data.push(data[0]);
        Self { data }
    }

    /// Nominal length (guard excluded).
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len() - 1
    }

    /// Always false: tables hold at least one value.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Nominal values (guard excluded).
    #[inline]
    pub fn data(&self) -> &[f32] {
        &self.data[..self.len()]
    }

    /// Value at `index`; `index == len()` reads the guard sample.
    #[inline]
    pub fn get(&self, index: usize) -> f32 {
        self.data[index.min(self.len())]
    }

    /// Linear interpolation at fractional `pos`, clamped to `[0, len]`.
    #[inline]
    pub fn interpolate(&self, pos: f32) -> f32 {
        let pos = pos.clamp(0.0, self.len() as f32);
        let ipart = pos as usize;
        if ipart >= self.len() {
            return self.data[self.len()];
        }
        let fpart = pos - ipart as f32;
        let a = self.data[ipart];
        a + (self.data[ipart + 1] - a) * fpart
    }

    /// Interpolated read at `pos` wrapped into one period.
    #[inline]
    pub fn read_wrapped(&self, pos: f32) -> f32 {
        self.interpolate(pos.rem_euclid(self.len() as f32))
    }
}

/// Shared sine table used by the oscillator bank.
pub fn sine_table() -> &'static LookupTable {
    static TABLE: OnceLock<LookupTable> = OnceLock::new();
    TABLE.get_or_init(|| LookupTable::waveform(Waveform::Sine, SINE_TABLE_SIZE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_table_rejected() {
        assert_eq!(
            LookupTable::new(vec![]),
            Err(PvocError::EmptyTable("lookup"))
        );
    }

    #[test]
    fn test_guard_sample_repeats_last_value() {
        let t = LookupTable::new(vec![0.0, 1.0, 2.0]).unwrap();
        assert_eq!(t.len(), 3);
        assert_eq!(t.data(), &[0.0, 1.0, 2.0]);
        assert_eq!(t.get(3), 2.0);
        assert_eq!(t.get(99), 2.0);
    }

    #[test]
    fn test_interpolate() {
        let t = LookupTable::new(vec![0.0, 1.0, 3.0]).unwrap();
        assert!((t.interpolate(0.5) - 0.5).abs() < 1e-6);
        assert!((t.interpolate(1.25) - 1.5).abs() < 1e-6);
        assert_eq!(t.interpolate(-4.0), 0.0);
        assert_eq!(t.interpolate(10.0), 3.0);
    }

    #[test]
    fn test_waveform_guard_is_first_sample() {
        let t = LookupTable::waveform(Waveform::Ramp, 8);
        assert_eq!(t.get(8), t.get(0));
        assert_eq!(t.get(0), -1.0);
        // Wraps back to the start of the period
        assert!((t.read_wrapped(8.0) - t.get(0)).abs() < 1e-6);
        assert!((t.read_wrapped(-4.0) - t.get(4)).abs() < 1e-6);
    }

    #[test]
    fn test_waveform_ranges() {
        for shape in [
            Waveform::Sine,
            Waveform::Saw,
            Waveform::Ramp,
            Waveform::Square,
            Waveform::Triangle,
        ] {
            let t = LookupTable::waveform(shape, 512);
            assert!(t.data().iter().all(|v| (-1.0..=1.0).contains(v)), "{:?}", shape);
        }
    }

    #[test]
    fn test_sine_table_shared() {
        let t = sine_table();
        assert_eq!(t.len(), SINE_TABLE_SIZE);
        assert!((t.get(SINE_TABLE_SIZE / 4) - 1.0).abs() < 1e-6);
        assert!(std::ptr::eq(t, sine_table()));
    }
}
