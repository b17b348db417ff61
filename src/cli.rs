use std::path::Path;
use std::time::Instant;

use pvstream::config::{read_chain_json, ChainConfig, ResynthesisConfig, StageConfig};
use pvstream::{PvocError, WindowType};

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 3 {
        print_usage();
        std::process::exit(1);
    }

    let input_path = &args[1];
    let output_path = &args[2];

    let mut chain_path: Option<String> = None;
    let mut sidechain_path: Option<String> = None;
    let mut fft_size: Option<usize> = None;
    let mut overlaps: Option<usize> = None;
    let mut window_type: Option<WindowType> = None;
    let mut block_size: Option<usize> = None;
    let mut extra_stages: Vec<StageConfig> = Vec::new();
    let mut oscillators = false;
    let mut format_float = false;
    let mut verbose = false;

    let mut i = 3;
    while i < args.len() {
        match args[i].as_str() {
            "--chain" | "-c" => {
                i += 1;
                chain_path = Some(parse_string(&args, i, "chain"));
            }
            "--sidechain" | "-s" => {
                i += 1;
                sidechain_path = Some(parse_string(&args, i, "sidechain"));
            }
            "--fft" => {
                i += 1;
                fft_size = Some(parse_usize(&args, i, "fft"));
            }
            "--overlaps" => {
                i += 1;
                overlaps = Some(parse_usize(&args, i, "overlaps"));
            }
            "--block" => {
                i += 1;
                block_size = Some(parse_usize(&args, i, "block"));
            }
            "--window" | "-w" => {
                i += 1;
                window_type = Some(parse_window(&args, i));
            }
            "--transpose" | "-t" => {
                i += 1;
                let transpo = parse_f32(&args, i, "transpose");
                extra_stages.push(StageConfig::Transpose { transpo });
            }
            "--shift" => {
                i += 1;
                let shift = parse_f32(&args, i, "shift");
                extra_stages.push(StageConfig::Shift { shift });
            }
            "--oscillators" => oscillators = true,
            "--float" => format_float = true,
            "--verbose" | "-v" => verbose = true,
            other => {
                eprintln!("ERROR: Unknown option '{}'", other);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let mut config = match chain_path {
        Some(ref path) => match read_chain_json(Path::new(path)) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("ERROR: Failed to read chain {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => ChainConfig::default(),
    };
    if let Some(n) = fft_size {
        config.params.fft_size = n;
    }
    if let Some(n) = overlaps {
        config.params.overlaps = n;
    }
    if let Some(n) = block_size {
        config.params.block_size = n;
    }
    if let Some(w) = window_type {
        config.params.window = w;
    }
    config.stages.extend(extra_stages);
    if oscillators && config.resynthesis == ResynthesisConfig::Inverse {
        config.resynthesis = ResynthesisConfig::Oscillators {
            pitch: 1.0,
            num: config.params.shape().bins(),
            first: 0,
            increment: 1,
        };
    }

    let input = match read_wav(input_path) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("ERROR: Failed to read {}: {}", input_path, e);
            std::process::exit(1);
        }
    };
    config.params.sample_rate = input.sample_rate;

    eprintln!(
        "Input: {} frames, {} Hz, {} channel(s), {:.2}s",
        input.num_frames(),
        input.sample_rate,
        input.channels.len(),
        input.num_frames() as f64 / input.sample_rate as f64
    );

    let side = match sidechain_path {
        Some(ref path) => match read_wav(path) {
            Ok(a) => {
                if a.sample_rate != input.sample_rate {
                    eprintln!(
                        "WARNING: Side chain is {} Hz, input is {} Hz; \
                         processing without resampling",
                        a.sample_rate, input.sample_rate
                    );
                }
                Some(a)
            }
            Err(e) => {
                eprintln!("ERROR: Failed to read {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => None,
    };
    if config.needs_sidechain() && side.is_none() {
        eprintln!(
            "WARNING: Chain has blend stages but no --sidechain; blending the input with itself"
        );
    }

    if verbose {
        let shape = config.params.shape();
        eprintln!(
            "FFT: {} x {} overlaps (hop {}), window {:?}, block {}",
            shape.fft_size,
            shape.overlaps,
            shape.hop_size(),
            config.params.window,
            config.params.block_size
        );
        eprintln!("Stages: {}", config.stages.len());
    }

    let start = Instant::now();
    let mut outputs = Vec::with_capacity(input.channels.len());
    for (ch, samples) in input.channels.iter().enumerate() {
        let side_samples = side.as_ref().map(|s| &s.channels[ch.min(s.channels.len() - 1)][..]);
        match render_channel(&config, samples, side_samples) {
            Ok(out) => outputs.push(out),
            Err(e) => {
                eprintln!("ERROR: Processing failed: {}", e);
                std::process::exit(1);
            }
        }
    }
    let elapsed = start.elapsed();

    if verbose {
        let secs = input.num_frames() as f64 / input.sample_rate as f64;
        eprintln!(
            "Processed in {:.3}s ({:.1}x realtime)",
            elapsed.as_secs_f64(),
            secs / elapsed.as_secs_f64().max(1e-9)
        );
    }

    let output = Audio {
        sample_rate: input.sample_rate,
        channels: outputs,
    };
    if let Err(e) = write_wav(output_path, &output, format_float) {
        eprintln!("ERROR: Failed to write {}: {}", output_path, e);
        std::process::exit(1);
    }
    eprintln!("Output: {}", output_path);
}

/// Deinterleaved audio.
struct Audio {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl Audio {
    fn num_frames(&self) -> usize {
        self.channels.first().map_or(0, |c| c.len())
    }
}

fn render_channel(
    config: &ChainConfig,
    samples: &[f32],
    side: Option<&[f32]>,
) -> Result<Vec<f32>, PvocError> {
    let mut chain = config.build()?;
    Ok(chain.render(samples, side))
}

fn read_wav(path: &str) -> Result<Audio, PvocError> {
    let mut reader = hound::WavReader::open(path).map_err(wav_error)?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;
    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(wav_error)?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1u64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<_, _>>()
                .map_err(wav_error)?
        }
    };
    let mut deinterleaved = vec![Vec::with_capacity(interleaved.len() / channels); channels];
    for frame in interleaved.chunks_exact(channels) {
        for (ch, &s) in frame.iter().enumerate() {
            deinterleaved[ch].push(s);
        }
    }
    Ok(Audio {
        sample_rate: spec.sample_rate,
        channels: deinterleaved,
    })
}

fn write_wav(path: &str, audio: &Audio, float: bool) -> Result<(), PvocError> {
    let spec = hound::WavSpec {
        channels: audio.channels.len() as u16,
        sample_rate: audio.sample_rate,
        bits_per_sample: if float { 32 } else { 16 },
        sample_format: if float {
            hound::SampleFormat::Float
        } else {
            hound::SampleFormat::Int
        },
    };
    let mut writer = hound::WavWriter::create(path, spec).map_err(wav_error)?;
    for i in 0..audio.num_frames() {
        for channel in &audio.channels {
            let s = channel[i];
            if float {
                writer.write_sample(s).map_err(wav_error)?;
            } else {
                let v = (s.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16;
                writer.write_sample(v).map_err(wav_error)?;
            }
        }
    }
    writer.finalize().map_err(wav_error)?;
    Ok(())
}

fn wav_error(e: hound::Error) -> PvocError {
    match e {
        hound::Error::IoError(io) => PvocError::from(io),
        other => PvocError::InvalidFormat(other.to_string()),
    }
}

fn print_usage() {
    eprintln!("Usage: pvfx <input.wav> <output.wav> [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --chain <file.json>   Chain description (stages, params, resynthesis)");
    eprintln!("  --sidechain <file>    Second input for cross/mult/morph/mix stages");
    eprintln!("  --fft <N>             FFT size (default: 1024, rounded to a power of two)");
    eprintln!("  --overlaps <N>        Overlap count (default: 4)");
    eprintln!("  --window <type>       hann (default), hamming, blackman, blackman-harris,");
    eprintln!("                        bartlett, tukey, sine, rect, kaiser:<beta>");
    eprintln!("  --block <N>           Samples per processing block (default: 256)");
    eprintln!("  --transpose <f>       Append a transposition stage (2.0 = octave up)");
    eprintln!("  --shift <hz>          Append a frequency shift stage");
    eprintln!("  --oscillators         Resynthesize with the oscillator bank");
    eprintln!("  --float               Write 32-bit float output (default: 16-bit)");
    eprintln!("  --verbose, -v         Show parameters, timing, and debug logs");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  pvfx in.wav out.wav --transpose 1.5");
    eprintln!("  pvfx in.wav out.wav --chain verb.json --fft 2048");
    eprintln!("  pvfx voice.wav out.wav --chain morph.json --sidechain synth.wav");
}

fn parse_string(args: &[String], idx: usize, name: &str) -> String {
    if idx >= args.len() {
        eprintln!("ERROR: --{} requires a value", name);
        std::process::exit(1);
    }
    args[idx].clone()
}

fn parse_f32(args: &[String], idx: usize, name: &str) -> f32 {
    if idx >= args.len() {
        eprintln!("ERROR: --{} requires a value", name);
        std::process::exit(1);
    }
    match args[idx].parse() {
        Ok(v) => v,
        Err(_) => {
            eprintln!("ERROR: Invalid {}: {}", name, args[idx]);
            std::process::exit(1);
        }
    }
}

fn parse_usize(args: &[String], idx: usize, name: &str) -> usize {
    if idx >= args.len() {
        eprintln!("ERROR: --{} requires a value", name);
        std::process::exit(1);
    }
    match args[idx].parse() {
        Ok(v) => v,
        Err(_) => {
            eprintln!("ERROR: Invalid {}: {}", name, args[idx]);
            std::process::exit(1);
        }
    }
}

fn parse_window(args: &[String], idx: usize) -> WindowType {
    if idx >= args.len() {
        eprintln!("ERROR: --window requires a value (hann, blackman-harris, kaiser:<beta>, ...)");
        std::process::exit(1);
    }
    parse_window_str(&args[idx])
}

fn parse_window_str(s: &str) -> WindowType {
    match s {
        "hann" | "hanning" => WindowType::Hann,
        "hamming" => WindowType::Hamming,
        "blackman" => WindowType::Blackman,
        "blackman-harris" | "bh" => WindowType::BlackmanHarris,
        "bartlett" | "triangle" => WindowType::Bartlett,
        "tukey" => WindowType::Tukey,
        "sine" => WindowType::Sine,
        "rect" | "rectangular" => WindowType::Rectangular,
        other if other.starts_with("kaiser:") => {
            let beta_str = &other["kaiser:".len()..];
            match beta_str.parse::<f64>() {
                Ok(beta) if beta >= 0.0 => WindowType::Kaiser((beta * 100.0).round() as u32),
                _ => {
                    eprintln!(
                        "ERROR: Invalid Kaiser beta: '{}' (expected positive number)",
                        beta_str
                    );
                    std::process::exit(1);
                }
            }
        }
        "kaiser" => WindowType::Kaiser(800),
        other => match other.parse::<usize>() {
            Ok(index) => WindowType::from_index(index),
            Err(_) => {
                eprintln!(
                    "ERROR: Unknown window type '{}' \
                     (use hann, blackman-harris, kaiser:<beta>, ...)",
                    other
                );
                std::process::exit(1);
            }
        },
    }
}
