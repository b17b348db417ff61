//! Serializable chain descriptions.
//!
//! A [`ChainConfig`] names the analysis parameters, an ordered list of
//! stages, and the resynthesis engine. It is stored as JSON:
//!
//! ```json
//! {
//!   "params": { "fft_size": 2048, "overlaps": 4 },
//!   "stages": [
//!     { "type": "transpose", "transpo": 1.5 },
//!     { "type": "verb", "revtime": 0.8, "damp": 0.5 }
//!   ],
//!   "resynthesis": { "type": "inverse" }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::table::{LookupTable, Waveform};
use crate::core::types::PvocParams;
use crate::effects::{
    FilterMode, PvAmpMod, PvBufLoops, PvBufTabLoops, PvBuffer, PvCross, PvDelay, PvFilter,
    PvFreqMod, PvGate, PvMix, PvMorph, PvMult, PvShift, PvTranspose, PvVerb, SpeedDistribution,
};
use crate::error::PvocError;
use crate::stream::{Resynthesis, SpectralChain, SpectralFrameStream};
use crate::synthesis::PvAddSynth;

fn default_gain() -> f32 {
    1.0
}

fn default_gate_thresh() -> f32 {
    -20.0
}

fn default_length() -> f32 {
    1.0
}

fn default_pitch() -> f32 {
    1.0
}

/// One spectral stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StageConfig {
    Transpose {
        transpo: f32,
    },
    Shift {
        shift: f32,
    },
    Verb {
        revtime: f32,
        damp: f32,
    },
    Gate {
        #[serde(default = "default_gate_thresh")]
        thresh: f32,
        #[serde(default)]
        damp: f32,
        #[serde(default)]
        inverse: bool,
    },
    Filter {
        table: Vec<f32>,
        #[serde(default = "default_gain")]
        gain: f32,
        #[serde(default)]
        mode: FilterMode,
    },
    Delay {
        delays: Vec<f32>,
        feedback: Vec<f32>,
        max_delay: f32,
    },
    Buffer {
        index: f32,
        #[serde(default = "default_pitch")]
        pitch: f32,
        #[serde(default = "default_length")]
        length: f32,
    },
    AmpMod {
        basefreq: f32,
        #[serde(default)]
        spread: f32,
        #[serde(default)]
        shape: Waveform,
    },
    FreqMod {
        basefreq: f32,
        #[serde(default)]
        spread: f32,
        depth: f32,
        #[serde(default)]
        shape: Waveform,
    },
    BufLoops {
        low: f32,
        high: f32,
        #[serde(default)]
        distribution: SpeedDistribution,
        #[serde(default = "default_length")]
        length: f32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        seed: Option<u64>,
    },
    BufTabLoops {
        speeds: Vec<f32>,
        #[serde(default = "default_length")]
        length: f32,
    },
    Cross {
        fade: f32,
    },
    Mult,
    Morph {
        fade: f32,
    },
    Mix,
}

impl StageConfig {
    /// True for stages that take a second input.
    pub fn is_blend(&self) -> bool {
        matches!(
            self,
            StageConfig::Cross { .. }
                | StageConfig::Mult
                | StageConfig::Morph { .. }
                | StageConfig::Mix
        )
    }
}

/// Resynthesis engine selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResynthesisConfig {
    #[default]
    Inverse,
    Oscillators {
        #[serde(default = "default_pitch")]
        pitch: f32,
        #[serde(default = "default_partials")]
        num: usize,
        #[serde(default)]
        first: usize,
        #[serde(default = "default_increment")]
        increment: usize,
    },
}

fn default_partials() -> usize {
    100
}

fn default_increment() -> usize {
    1
}

/// Complete description of a [`SpectralChain`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    #[serde(default)]
    pub params: PvocParams,
    #[serde(default)]
    pub stages: Vec<StageConfig>,
    #[serde(default)]
    pub resynthesis: ResynthesisConfig,
}

impl ChainConfig {
    /// True when any stage blends in a side-chain signal.
    pub fn needs_sidechain(&self) -> bool {
        self.stages.iter().any(StageConfig::is_blend)
    }

    /// Builds the chain, enabling the side chain when a blend stage exists.
    pub fn build(&self) -> Result<SpectralChain, PvocError> {
        self.params.validate()?;
        let mut chain = SpectralChain::new(&self.params)?;
        if self.needs_sidechain() {
            chain.enable_sidechain()?;
        }
        let sr = self.params.sample_rate;
        for stage in &self.stages {
            add_stage(&mut chain, stage, sr)?;
        }
        if let ResynthesisConfig::Oscillators {
            pitch,
            num,
            first,
            increment,
        } = self.resynthesis
        {
            let synth = PvAddSynth::new(chain.source(), sr, pitch)?
                .with_num(num)
                .with_first(first)
                .with_increment(increment);
            chain.set_resynthesis(Resynthesis::Oscillators(synth));
        }
        Ok(chain)
    }
}

fn add_stage(chain: &mut SpectralChain, stage: &StageConfig, sr: u32) -> Result<(), PvocError> {
    let input = chain.source();
    match stage {
        StageConfig::Transpose { transpo } => {
            let op = PvTranspose::new(input, *transpo);
            chain.push_effect(op);
        }
        StageConfig::Shift { shift } => {
            let op = PvShift::new(input, sr, *shift)?;
            chain.push_effect(op);
        }
        StageConfig::Verb { revtime, damp } => {
            let op = PvVerb::new(input, *revtime, *damp);
            chain.push_effect(op);
        }
        StageConfig::Gate {
            thresh,
            damp,
            inverse,
        } => {
            let op = PvGate::new(input, *thresh, *damp).with_inverse(*inverse);
            chain.push_effect(op);
        }
        StageConfig::Filter { table, gain, mode } => {
            let table = LookupTable::new(table.clone())?;
            let op = PvFilter::new(input, table, *gain, *mode);
            chain.push_effect(op);
        }
        StageConfig::Delay {
            delays,
            feedback,
            max_delay,
        } => {
            let delays = LookupTable::new(delays.clone())?;
            let feedback = LookupTable::new(feedback.clone())?;
            let op = PvDelay::new(input, sr, delays, feedback, *max_delay)?;
            chain.push_effect(op);
        }
        StageConfig::Buffer {
            index,
            pitch,
            length,
        } => {
            let op = PvBuffer::new(input, sr, *index, *pitch, *length)?;
            chain.push_effect(op);
        }
        StageConfig::AmpMod {
            basefreq,
            spread,
            shape,
        } => {
            let op = PvAmpMod::new(input, sr, *basefreq, *spread, *shape)?;
            chain.push_effect(op);
        }
        StageConfig::FreqMod {
            basefreq,
            spread,
            depth,
            shape,
        } => {
            let op = PvFreqMod::new(input, sr, *basefreq, *spread, *depth, *shape)?;
            chain.push_effect(op);
        }
        StageConfig::BufLoops {
            low,
            high,
            distribution,
            length,
            seed,
        } => {
            let mut op = PvBufLoops::new(input, sr, *low, *high, *distribution, *length)?;
            if let Some(seed) = seed {
                op = op.with_seed(*seed);
            }
            chain.push_effect(op);
        }
        StageConfig::BufTabLoops { speeds, length } => {
            let speeds = LookupTable::new(speeds.clone())?;
            let op = PvBufTabLoops::new(input, sr, speeds, *length)?;
            chain.push_effect(op);
        }
        StageConfig::Cross { fade } => {
            let op = PvCross::new(input, side_source(chain)?, *fade)?;
            chain.push_blend(op);
        }
        StageConfig::Mult => {
            let op = PvMult::new(input, side_source(chain)?)?;
            chain.push_blend(op);
        }
        StageConfig::Morph { fade } => {
            let op = PvMorph::new(input, side_source(chain)?, *fade)?;
            chain.push_blend(op);
        }
        StageConfig::Mix => {
            let op = PvMix::new(input, side_source(chain)?)?;
            chain.push_blend(op);
        }
    }
    Ok(())
}

fn side_source(chain: &SpectralChain) -> Result<&SpectralFrameStream, PvocError> {
    chain.sidechain_source().ok_or_else(|| {
        PvocError::InvalidParameter("blend stage requires a side chain".to_string())
    })
}

/// Writes a chain description as pretty-printed JSON.
pub fn write_chain_json(path: &Path, config: &ChainConfig) -> Result<(), PvocError> {
    let json = serde_json::to_string_pretty(config).map_err(|e| {
        PvocError::InvalidFormat(format!("failed to serialize chain description: {}", e))
    })?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Reads a chain description from JSON.
pub fn read_chain_json(path: &Path) -> Result<ChainConfig, PvocError> {
    let data = std::fs::read_to_string(path)?;
    serde_json::from_str(&data).map_err(|e| {
        PvocError::InvalidFormat(format!(
            "failed to parse chain description from {}: {}",
            path.display(),
            e
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_json_uses_defaults() {
        let config: ChainConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ChainConfig::default());
        assert_eq!(config.params.fft_size, 1024);
        assert!(!config.needs_sidechain());
    }

    #[test]
    fn test_parse_tagged_stages() {
        let json = r#"{
            "params": { "fft_size": 512, "overlaps": 8, "window": "blackman_harris" },
            "stages": [
                { "type": "gate", "thresh": -40.0 },
                { "type": "filter", "table": [1.0, 0.5], "mode": "scaled" },
                {
                    "type": "buf_loops", "low": 0.5, "high": 2.0,
                    "distribution": "random_bi_exp", "seed": 9
                },
                { "type": "mix" }
            ],
            "resynthesis": { "type": "oscillators", "pitch": 2.0 }
        }"#;
        let config: ChainConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.params.overlaps, 8);
        assert_eq!(
            config.stages[0],
            StageConfig::Gate {
                thresh: -40.0,
                damp: 0.0,
                inverse: false
            }
        );
        assert!(matches!(
            config.stages[1],
            StageConfig::Filter {
                mode: FilterMode::Scaled,
                gain,
                ..
            } if gain == 1.0
        ));
        assert!(config.needs_sidechain());
        assert_eq!(
            config.resynthesis,
            ResynthesisConfig::Oscillators {
                pitch: 2.0,
                num: 100,
                first: 0,
                increment: 1
            }
        );
    }

    #[test]
    fn test_build_chain() {
        let config = ChainConfig {
            params: PvocParams::default().with_fft_size(256),
            stages: vec![
                StageConfig::Transpose { transpo: 1.0 },
                StageConfig::Verb {
                    revtime: 0.5,
                    damp: 0.5,
                },
                StageConfig::Morph { fade: 0.5 },
            ],
            resynthesis: ResynthesisConfig::Inverse,
        };
        let chain = config.build().unwrap();
        assert_eq!(chain.stage_count(), 3);
        assert!(chain.has_sidechain());
    }

    #[test]
    fn test_build_rejects_empty_table() {
        let config = ChainConfig {
            stages: vec![StageConfig::Filter {
                table: vec![],
                gain: 1.0,
                mode: FilterMode::BinByBin,
            }],
            ..ChainConfig::default()
        };
        assert_eq!(
            config.build().err(),
            Some(PvocError::EmptyTable("lookup"))
        );
    }

    #[test]
    fn test_unknown_stage_rejected() {
        let json = r#"{ "stages": [ { "type": "granulate" } ] }"#;
        assert!(serde_json::from_str::<ChainConfig>(json).is_err());
    }
}
