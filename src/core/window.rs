//! Window functions for spectral analysis and overlap-add resynthesis.
//!
//! All windows are generated in periodic form (denominator `n` rather than
//! `n - 1`), the form that tiles exactly under overlap-add.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Blackman-Harris window coefficients (4-term).
const BH_A0: f64 = 0.35875;
const BH_A1: f64 = 0.48829;
const BH_A2: f64 = 0.14128;
const BH_A3: f64 = 0.01168;

/// Taper fraction of the Tukey window.
const TUKEY_ALPHA: f64 = 0.66;

/// Window function types.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowType {
    Rectangular,
    Hamming,
    #[default]
    Hann,
    Bartlett,
    Blackman,
    BlackmanHarris,
    Tukey,
    Sine,
    Kaiser(u32), // beta parameter scaled by 100 (e.g., 800 = 8.0)
}

impl WindowType {
    /// Maps the classic integer window selector.
    ///
    /// Out-of-range selectors are clamped to the last entry with a warning.
    pub fn from_index(index: usize) -> Self {
        const TABLE: [WindowType; 8] = [
            WindowType::Rectangular,
            WindowType::Hamming,
            WindowType::Hann,
            WindowType::Bartlett,
            WindowType::Blackman,
            WindowType::BlackmanHarris,
            WindowType::Tukey,
            WindowType::Sine,
        ];
        match TABLE.get(index) {
            Some(w) => *w,
            None => {
                log::warn!(
                    "window selector {} out of range, using {:?}",
                    index,
                    TABLE[TABLE.len() - 1]
                );
                TABLE[TABLE.len() - 1]
            }
        }
    }
}

/// Generates a window function of the specified type and size.
pub fn generate_window(window_type: WindowType, size: usize) -> Vec<f32> {
    match size {
        0 => return vec![],
        1 => return vec![1.0],
        _ => {}
    }
    let n = size as f64;
    let shape: Box<dyn Fn(f64) -> f64> = match window_type {
        WindowType::Rectangular => Box::new(|_| 1.0),
        WindowType::Hamming => Box::new(|x| 0.54 - 0.46 * (2.0 * PI * x).cos()),
        WindowType::Hann => Box::new(|x| 0.5 - 0.5 * (2.0 * PI * x).cos()),
        WindowType::Bartlett => Box::new(|x| 1.0 - (2.0 * x - 1.0).abs()),
        WindowType::Blackman => Box::new(|x| {
            0.42 - 0.5 * (2.0 * PI * x).cos() + 0.08 * (4.0 * PI * x).cos()
        }),
        WindowType::BlackmanHarris => Box::new(|x| {
            BH_A0 - BH_A1 * (2.0 * PI * x).cos() + BH_A2 * (4.0 * PI * x).cos()
                - BH_A3 * (6.0 * PI * x).cos()
        }),
        WindowType::Tukey => Box::new(tukey),
        WindowType::Sine => Box::new(|x| (PI * x).sin()),
        WindowType::Kaiser(beta_100) => {
            let beta = beta_100 as f64 / 100.0;
            let denom = bessel_i0(beta);
            Box::new(move |x| {
                let t = 2.0 * x - 1.0;
                bessel_i0(beta * (1.0 - t * t).max(0.0).sqrt()) / denom
            })
        }
    };
    (0..size).map(|i| shape(i as f64 / n) as f32).collect()
}

fn tukey(x: f64) -> f64 {
    let edge = TUKEY_ALPHA / 2.0;
    if x < edge {
        0.5 * (1.0 + (PI * (x / edge - 1.0)).cos())
    } else if x <= 1.0 - edge {
        1.0
    } else {
        0.5 * (1.0 + (PI * ((x - 1.0) / edge + 1.0)).cos())
    }
}

/// Maximum number of series terms for Bessel I0 convergence.
const BESSEL_MAX_TERMS: usize = 30;
/// Relative convergence threshold for Bessel I0 series.
const BESSEL_CONVERGENCE: f64 = 1e-15;

/// Zeroth-order modified Bessel function of the first kind.
/// Computed via series expansion.
#[inline]
fn bessel_i0(x: f64) -> f64 {
    let mut sum = 1.0;
    let mut term = 1.0;
    let x_half = x / 2.0;
    for k in 1..BESSEL_MAX_TERMS {
        term *= (x_half / k as f64) * (x_half / k as f64);
        sum += term;
        if term < BESSEL_CONVERGENCE * sum {
            break;
        }
    }
    sum
}

/// Sum of window coefficients.
#[inline]
pub fn window_sum(window: &[f32]) -> f32 {
    window.iter().sum()
}

/// Sum of squared window coefficients.
#[inline]
pub fn window_energy(window: &[f32]) -> f32 {
    window.iter().map(|w| w * w).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [WindowType; 9] = [
        WindowType::Rectangular,
        WindowType::Hamming,
        WindowType::Hann,
        WindowType::Bartlett,
        WindowType::Blackman,
        WindowType::BlackmanHarris,
        WindowType::Tukey,
        WindowType::Sine,
        WindowType::Kaiser(800),
    ];

    #[test]
    fn test_hann_window_properties() {
        let w = generate_window(WindowType::Hann, 1024);
        assert_eq!(w.len(), 1024);
        assert!(w[0].abs() < 1e-6);
        assert!((w[512] - 1.0).abs() < 1e-6);
        // Periodic symmetry: w[i] == w[n - i]
        for i in 1..512 {
            assert!((w[i] - w[1024 - i]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_periodic_symmetry_all_types() {
        for window_type in ALL {
            let w = generate_window(window_type, 256);
            for i in 1..128 {
                assert!(
                    (w[i] - w[256 - i]).abs() < 1e-5,
                    "{:?} not symmetric at {}",
                    window_type,
                    i
                );
            }
        }
    }

    #[test]
    fn test_hann_squared_overlap_add_is_constant() {
        let n = 512;
        let w = generate_window(WindowType::Hann, n);
        for overlaps in [4usize, 8] {
            let hop = n / overlaps;
            let expected = window_energy(&w) / hop as f32;
            for pos in 0..hop {
                let sum: f32 = (0..overlaps).map(|m| w[pos + m * hop].powi(2)).sum();
                assert!(
                    (sum - expected).abs() < 1e-4,
                    "overlaps {}: {} vs {}",
                    overlaps,
                    sum,
                    expected
                );
            }
        }
    }

    #[test]
    fn test_sine_squared_tiles_at_half_overlap() {
        let n = 256;
        let w = generate_window(WindowType::Sine, n);
        for pos in 0..n / 2 {
            let sum = w[pos].powi(2) + w[pos + n / 2].powi(2);
            assert!((sum - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_kaiser_peak_in_middle() {
        let w = generate_window(WindowType::Kaiser(800), 1024);
        let mid = w[512];
        for &v in &w {
            assert!(v <= mid + 1e-6);
        }
    }

    #[test]
    fn test_degenerate_sizes() {
        for window_type in ALL {
            assert!(generate_window(window_type, 0).is_empty());
            assert_eq!(generate_window(window_type, 1), vec![1.0]);
        }
    }

    #[test]
    fn test_from_index_clamps() {
        assert_eq!(WindowType::from_index(0), WindowType::Rectangular);
        assert_eq!(WindowType::from_index(2), WindowType::Hann);
        assert_eq!(WindowType::from_index(42), WindowType::Sine);
    }

    #[test]
    fn test_window_sums() {
        let w = generate_window(WindowType::Rectangular, 64);
        assert_eq!(window_sum(&w), 64.0);
        assert_eq!(window_energy(&w), 64.0);
    }
}
