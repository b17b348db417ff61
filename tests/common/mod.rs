#![allow(dead_code)]

use std::f32::consts::PI;

use pvstream::{FrameShape, SpectralFrameStream};

pub fn gen_sine(freq_hz: f32, sr: u32, n: usize, amp: f32) -> Vec<f32> {
    (0..n)
        .map(|i| amp * (2.0 * PI * freq_hz * i as f32 / sr as f32).sin())
        .collect()
}

pub fn gen_two_tone(freq_a: f32, freq_b: f32, sr: u32, n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| {
            let t = i as f32 / sr as f32;
            0.3 * (2.0 * PI * freq_a * t).sin() + 0.3 * (2.0 * PI * freq_b * t).sin()
        })
        .collect()
}

pub fn rms(signal: &[f32]) -> f32 {
    if signal.is_empty() {
        return 0.0;
    }
    (signal.iter().map(|x| x * x).sum::<f32>() / signal.len() as f32).sqrt()
}

pub fn max_abs_diff(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).abs())
        .fold(0.0f32, f32::max)
}

/// Stream whose every slot holds `magnitude`/`frequency`.
pub fn filled_stream(
    shape: FrameShape,
    magnitude: &[f32],
    frequency: &[f32],
) -> SpectralFrameStream {
    let mut stream = SpectralFrameStream::new(shape);
    for slot in 0..shape.overlaps {
        stream.publish_slot(slot, magnitude, frequency);
    }
    stream
}

/// Starts a one-sample block on which a slot completes.
pub fn tick(stream: &mut SpectralFrameStream) {
    let last = stream.fft_size() - 1;
    stream.begin_block(1);
    stream.set_progress(0, last);
}

/// Overwrites every slot and starts a completing block.
pub fn publish_and_tick(stream: &mut SpectralFrameStream, magnitude: &[f32], frequency: &[f32]) {
    for slot in 0..stream.overlaps() {
        stream.publish_slot(slot, magnitude, frequency);
    }
    tick(stream);
}
