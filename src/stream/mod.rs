//! Frame streams and the block-based processing chain.

pub mod frames;
pub mod processor;

pub use frames::SpectralFrameStream;
pub use processor::{Resynthesis, SpectralChain};
