mod common;

use common::{gen_sine, gen_two_tone, max_abs_diff};
use pvstream::{PvAnalyzer, PvSynth, PvocParams, SpectralChain, WindowType};

/// Window that tiles under overlap-add (after squaring) for each overlap
/// count.
fn window_for(overlaps: usize) -> WindowType {
    match overlaps {
        1 => WindowType::Rectangular,
        2 => WindowType::Sine,
        _ => WindowType::Hann,
    }
}

#[test]
fn test_identity_grid() {
    for &fft_size in &[256usize, 512, 1024, 2048, 4096] {
        for &overlaps in &[1usize, 2, 4, 8] {
            let params = PvocParams::default()
                .with_fft_size(fft_size)
                .with_overlaps(overlaps)
                .with_window(window_for(overlaps));
            let mut chain = SpectralChain::new(&params).unwrap();
            let input = gen_sine(440.0, 44100, fft_size * 8, 0.5);
            let output = chain.render(&input, None);
            assert_eq!(output.len(), input.len());

            let interior = fft_size..input.len() - fft_size;
            let err = max_abs_diff(&input[interior.clone()], &output[interior]);
            assert!(
                err < 0.02,
                "fft {} overlaps {}: max error {}",
                fft_size,
                overlaps,
                err
            );
        }
    }
}

#[test]
fn test_synth_delay_is_one_fft() {
    let params = PvocParams::default().with_fft_size(512).with_overlaps(4);
    let mut analyzer = PvAnalyzer::new(&params).unwrap();
    let mut synth = PvSynth::new(analyzer.output(), params.sample_rate, params.window).unwrap();
    assert_eq!(synth.latency(), 512);

    let input = gen_two_tone(300.0, 1700.0, 44100, 512 * 12);
    let mut output = Vec::new();
    for block in input.chunks(params.block_size) {
        analyzer.process(block);
        output.extend_from_slice(synth.process(analyzer.output()));
    }
    assert_eq!(output.len(), input.len());

    let start = 2 * 512;
    let err = max_abs_diff(&input[start - 512..input.len() - 512], &output[start..]);
    assert!(err < 0.02, "max error {}", err);
}

#[test]
fn test_output_is_silent_until_latency() {
    let params = PvocParams::default().with_fft_size(1024).with_overlaps(4);
    let mut chain = SpectralChain::new(&params).unwrap();
    let input = gen_sine(1000.0, 44100, 4096, 0.5);
    let output = chain.process(&input, None);
    // Nothing is synthesized before the first frame completes
    assert!(output[..256].iter().all(|&s| s == 0.0));
    assert!(output[..768].iter().all(|&s| s.abs() < 0.02));
}

#[test]
fn test_block_size_does_not_change_output() {
    let input = gen_two_tone(220.0, 880.0, 44100, 8192);
    let mut reference: Option<Vec<f32>> = None;
    for &block_size in &[1usize, 64, 256, 1000] {
        let params = PvocParams::default()
            .with_fft_size(512)
            .with_block_size(block_size);
        let mut chain = SpectralChain::new(&params).unwrap();
        let output = chain.render(&input, None);
        match &reference {
            None => reference = Some(output),
            Some(r) => {
                let err = max_abs_diff(r, &output);
                assert!(err < 1e-6, "block {} differs by {}", block_size, err);
            }
        }
    }
}
