use crate::analysis::PvAnalyzer;
use crate::core::types::PvocParams;
use crate::effects::{SpectralBlend, SpectralEffect};
use crate::error::PvocError;
use crate::stream::SpectralFrameStream;
use crate::synthesis::{PvAddSynth, PvSynth};

/// Final stage turning frames back into samples.
#[derive(Debug)]
pub enum Resynthesis {
    Inverse(PvSynth),
    Oscillators(PvAddSynth),
}

impl Resynthesis {
    pub fn process(&mut self, input: &SpectralFrameStream) -> &[f32] {
        match self {
            Resynthesis::Inverse(synth) => synth.process(input),
            Resynthesis::Oscillators(synth) => synth.process(input),
        }
    }

    /// Delay from analyzer input to output, in samples.
    pub fn latency(&self) -> usize {
        match self {
            Resynthesis::Inverse(synth) => synth.latency(),
            Resynthesis::Oscillators(synth) => synth.latency(),
        }
    }

    pub fn reset(&mut self) {
        match self {
            Resynthesis::Inverse(synth) => synth.reset(),
            Resynthesis::Oscillators(synth) => synth.reset(),
        }
    }
}

/// One processing stage between analysis and resynthesis.
pub enum Stage {
    Effect(Box<dyn SpectralEffect>),
    /// Second input is the side-chain analyzer when present, otherwise the
    /// stage's own input.
    Blend(Box<dyn SpectralBlend>),
}

/// Block-based driver: analyzer, ordered spectral stages, resynthesis.
///
/// Accepts input chunks of any length and runs the graph in blocks of
/// `block_size` samples, producers before consumers, so every stage sees
/// each frame stream exactly once per block.
pub struct SpectralChain {
    params: PvocParams,
    analyzer: PvAnalyzer,
    sidechain: Option<PvAnalyzer>,
    stages: Vec<Stage>,
    resynthesis: Resynthesis,
    side_block: Vec<f32>,
    /// Whether the last `process` call carried a side signal.
    side_supplied: bool,
}

impl SpectralChain {
    /// Creates a chain with no stages and inverse-FFT resynthesis.
    pub fn new(params: &PvocParams) -> Result<Self, PvocError> {
        let analyzer = PvAnalyzer::new(params)?;
        let synth = PvSynth::new(analyzer.output(), params.sample_rate, params.window)?;
        Ok(Self {
            params: params.clone(),
            analyzer,
            sidechain: None,
            stages: Vec::new(),
            resynthesis: Resynthesis::Inverse(synth),
            side_block: Vec::with_capacity(params.block_size),
            side_supplied: false,
        })
    }

    pub fn params(&self) -> &PvocParams {
        &self.params
    }

    /// The analyzer's stream, for constructing stages.
    pub fn source(&self) -> &SpectralFrameStream {
        self.analyzer.output()
    }

    /// The side-chain analyzer's stream, if enabled.
    pub fn sidechain_source(&self) -> Option<&SpectralFrameStream> {
        self.sidechain.as_ref().map(|a| a.output())
    }

    /// Adds a second analyzer whose frames feed the blend stages.
    pub fn enable_sidechain(&mut self) -> Result<(), PvocError> {
        if self.sidechain.is_none() {
            self.sidechain = Some(PvAnalyzer::new(&self.params)?);
        }
        Ok(())
    }

    pub fn has_sidechain(&self) -> bool {
        self.sidechain.is_some()
    }

    pub fn push_effect<E: SpectralEffect + 'static>(&mut self, effect: E) {
        self.stages.push(Stage::Effect(Box::new(effect)));
    }

    pub fn push_blend<B: SpectralBlend + 'static>(&mut self, blend: B) {
        self.stages.push(Stage::Blend(Box::new(blend)));
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    pub fn set_resynthesis(&mut self, resynthesis: Resynthesis) {
        self.resynthesis = resynthesis;
    }

    pub fn resynthesis(&self) -> &Resynthesis {
        &self.resynthesis
    }

    /// Returns the latency in samples.
    pub fn latency_samples(&self) -> usize {
        self.resynthesis.latency()
    }

    /// Returns the latency in seconds.
    pub fn latency_secs(&self) -> f64 {
        self.latency_samples() as f64 / self.params.sample_rate as f64
    }

    /// Processes a chunk of mono samples and returns as many output
    /// samples, delayed by [`latency_samples`](Self::latency_samples).
    ///
    /// `side` feeds the side-chain analyzer; samples past its end read as
    /// silence. With `None`, blend stages pair the main stream with itself.
    /// It is ignored when no side chain is enabled.
    pub fn process(&mut self, input: &[f32], side: Option<&[f32]>) -> Vec<f32> {
        self.side_supplied = side.is_some();
        let mut output = Vec::with_capacity(input.len());
        let block_size = self.params.block_size.max(1);
        for (n, block) in input.chunks(block_size).enumerate() {
            let start = n * block_size;
            self.side_block.clear();
            if let Some(side) = side {
                let end = (start + block.len()).min(side.len());
                if start < end {
                    self.side_block.extend_from_slice(&side[start..end]);
                }
            }
            self.side_block.resize(block.len(), 0.0);
            self.run_block(block, &mut output);
        }
        output
    }

    /// Pushes one latency's worth of silence through the chain and returns
    /// the tail it releases.
    pub fn flush(&mut self) -> Vec<f32> {
        let silence = vec![0.0; self.latency_samples()];
        let side: Option<&[f32]> = if self.side_supplied { Some(&[][..]) } else { None };
        self.process(&silence, side)
    }

    /// Processes a whole signal and returns output aligned with it: the
    /// latency is compensated and the length matches `input`.
    pub fn render(&mut self, input: &[f32], side: Option<&[f32]>) -> Vec<f32> {
        let latency = self.latency_samples();
        let mut output = self.process(input, side);
        output.extend(self.flush());
        output.drain(..latency.min(output.len()));
        output.truncate(input.len());
        output
    }

    /// Clears all history in every node.
    pub fn reset(&mut self) {
        self.analyzer.reset();
        if let Some(sidechain) = self.sidechain.as_mut() {
            sidechain.reset();
        }
        for stage in self.stages.iter_mut() {
            match stage {
                Stage::Effect(effect) => effect.reset(),
                Stage::Blend(blend) => blend.reset(),
            }
        }
        self.resynthesis.reset();
    }

    fn run_block(&mut self, block: &[f32], output: &mut Vec<f32>) {
        self.analyzer.process(block);
        if let Some(sidechain) = self.sidechain.as_mut() {
            sidechain.process(&self.side_block);
        }
        let side = if self.side_supplied {
            self.sidechain.as_ref().map(|a| a.output())
        } else {
            None
        };
        let mut current = self.analyzer.output();
        for stage in self.stages.iter_mut() {
            current = match stage {
                Stage::Effect(effect) => {
                    effect.process(current);
                    let effect: &dyn SpectralEffect = &**effect;
                    effect.output()
                }
                Stage::Blend(blend) => {
                    blend.process(current, side.unwrap_or(current));
                    let blend: &dyn SpectralBlend = &**blend;
                    blend.output()
                }
            };
        }
        output.extend_from_slice(self.resynthesis.process(current));
    }
}

impl std::fmt::Debug for SpectralChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectralChain")
            .field("params", &self.params)
            .field("sidechain", &self.sidechain.is_some())
            .field("stages", &self.stages.len())
            .field("resynthesis", &self.resynthesis)
            .finish()
    }
}
