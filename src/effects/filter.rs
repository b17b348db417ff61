//! Spectral filtering by a gain table.

use serde::{Deserialize, Serialize};

use crate::core::control::Control;
use crate::core::table::LookupTable;
use crate::stream::SpectralFrameStream;

use super::{FrameFollower, SpectralEffect};

/// How the gain table is mapped onto bins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    /// Table index = bin index; bins past the table get zero gain.
    #[default]
    BinByBin,
    /// The whole table is stretched over the bins, interpolated.
    Scaled,
}

impl FilterMode {
    pub fn from_index(index: usize) -> Self {
        match index {
            0 => FilterMode::BinByBin,
            1 => FilterMode::Scaled,
            _ => {
                log::warn!("filter mode {} out of range, using scaled", index);
                FilterMode::Scaled
            }
        }
    }
}

/// Multiplies magnitudes by a per-bin gain read from a table.
///
/// `gain` in `[0, 1]` blends between the unfiltered (0) and fully filtered
/// (1) spectrum.
#[derive(Debug, Clone)]
pub struct PvFilter {
    follower: FrameFollower,
    table: LookupTable,
    gain: Control,
    mode: FilterMode,
}

impl PvFilter {
    pub fn new(
        input: &SpectralFrameStream,
        table: LookupTable,
        gain: impl Into<Control>,
        mode: FilterMode,
    ) -> Self {
        Self {
            follower: FrameFollower::new(input.shape()),
            table,
            gain: gain.into(),
            mode,
        }
    }

    pub fn set_table(&mut self, table: LookupTable) {
        self.table = table;
    }

    pub fn set_gain(&mut self, gain: impl Into<Control>) {
        self.gain = gain.into();
    }

    pub fn set_mode(&mut self, mode: FilterMode) {
        self.mode = mode;
    }
}

impl SpectralEffect for PvFilter {
    fn process(&mut self, input: &SpectralFrameStream) {
        self.follower.sync(input);
        let (table, gain, mode) = (&self.table, &self.gain, self.mode);
        self.follower.run(input, |i, slot, magnitude, frequency| {
            let gain = gain.at(i).clamp(0.0, 1.0);
            let (in_mag, in_freq) = input.slot(slot);
            let bins = in_mag.len();
            let scale = table.len() as f32 / bins as f32;
            for k in 0..bins {
                let g = match mode {
                    FilterMode::BinByBin if k < table.len() => table.get(k),
                    FilterMode::BinByBin => 0.0,
                    FilterMode::Scaled => table.interpolate(k as f32 * scale),
                };
                magnitude[k] = in_mag[k] * (g * gain + 1.0 - gain);
                frequency[k] = in_freq[k];
            }
        });
    }

    fn output(&self) -> &SpectralFrameStream {
        self.follower.output()
    }

    fn reset(&mut self) {
        self.follower.rewind();
    }
}
