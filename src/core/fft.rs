//! Packed real-FFT adapter.
//!
//! Frames are exchanged in the classic packed real layout: index 0 holds
//! DC, `1..n/2` hold real parts, `n/2` holds Nyquist, and `n-k` holds the
//! imaginary part of bin `k`.

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Zero-valued complex number, used for FFT buffer initialization.
pub const COMPLEX_ZERO: Complex<f32> = Complex::new(0.0, 0.0);

/// Forward/inverse real transform of a fixed power-of-two size.
pub struct RealFft {
    size: usize,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl RealFft {
    /// Plans both directions for `size` points.
    pub fn new(size: usize) -> Self {
        debug_assert!(size.is_power_of_two(), "FFT size must be a power of two");
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(size);
        let inverse = planner.plan_fft_inverse(size);
        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());
        Self {
            size,
            forward,
            inverse,
            buffer: vec![COMPLEX_ZERO; size],
            scratch: vec![COMPLEX_ZERO; scratch_len],
        }
    }

    /// Transform length.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// In-place forward transform: time domain in, packed spectrum out.
    pub fn forward(&mut self, data: &mut [f32]) {
        let n = self.size;
        debug_assert_eq!(data.len(), n);
        for (c, &x) in self.buffer.iter_mut().zip(data.iter()) {
            *c = Complex::new(x, 0.0);
        }
        self.forward
            .process_with_scratch(&mut self.buffer, &mut self.scratch);

        let half = n / 2;
        data[0] = self.buffer[0].re;
        data[half] = self.buffer[half].re;
        for k in 1..half {
            data[k] = self.buffer[k].re;
            data[n - k] = self.buffer[k].im;
        }
    }

    /// In-place inverse transform: packed spectrum in, time domain out.
    ///
    /// Normalized so that `inverse(forward(x)) == x`.
    pub fn inverse(&mut self, data: &mut [f32]) {
        let n = self.size;
        debug_assert_eq!(data.len(), n);
        let half = n / 2;
        self.buffer[0] = Complex::new(data[0], 0.0);
        self.buffer[half] = Complex::new(data[half], 0.0);
        for k in 1..half {
            let bin = Complex::new(data[k], data[n - k]);
            self.buffer[k] = bin;
            self.buffer[n - k] = bin.conj();
        }
        self.inverse
            .process_with_scratch(&mut self.buffer, &mut self.scratch);

        let norm = 1.0 / n as f32;
        for (x, c) in data.iter_mut().zip(self.buffer.iter()) {
            *x = c.re * norm;
        }
    }
}

impl std::fmt::Debug for RealFft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealFft").field("size", &self.size).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_forward_packed_layout_cosine() {
        let n = 64;
        let mut fft = RealFft::new(n);
        // cos at bin 5: real part n/2, imaginary part 0
        let mut data: Vec<f32> = (0..n)
            .map(|i| (2.0 * PI * 5.0 * i as f32 / n as f32).cos())
            .collect();
        fft.forward(&mut data);
        assert!((data[5] - 32.0).abs() < 1e-3);
        assert!(data[n - 5].abs() < 1e-3);
        assert!(data[0].abs() < 1e-3);
    }

    #[test]
    fn test_forward_packed_layout_sine() {
        let n = 64;
        let mut fft = RealFft::new(n);
        // sin at bin 3: imaginary part -n/2
        let mut data: Vec<f32> = (0..n)
            .map(|i| (2.0 * PI * 3.0 * i as f32 / n as f32).sin())
            .collect();
        fft.forward(&mut data);
        assert!(data[3].abs() < 1e-3);
        assert!((data[n - 3] + 32.0).abs() < 1e-3);
    }

    #[test]
    fn test_dc_and_nyquist() {
        let n = 16;
        let mut fft = RealFft::new(n);
        let mut data: Vec<f32> = (0..n)
            .map(|i| 1.0 + if i % 2 == 0 { 1.0 } else { -1.0 })
            .collect();
        fft.forward(&mut data);
        assert!((data[0] - 16.0).abs() < 1e-4);
        assert!((data[8] - 16.0).abs() < 1e-4);
    }

    #[test]
    fn test_inverse_restores_signal() {
        let n = 256;
        let mut fft = RealFft::new(n);
        let original: Vec<f32> = (0..n)
            .map(|i| ((i * 7919) % 113) as f32 / 113.0 - 0.5)
            .collect();
        let mut data = original.clone();
        fft.forward(&mut data);
        fft.inverse(&mut data);
        for (a, b) in original.iter().zip(data.iter()) {
            assert!((a - b).abs() < 1e-5);
        }
    }
}
