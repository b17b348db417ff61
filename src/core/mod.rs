//! Core types, transforms, windows, and buffers shared by every node.

pub mod control;
pub mod fft;
pub mod ring_buffer;
pub mod table;
pub mod types;
pub mod window;

pub use control::Control;
pub use fft::RealFft;
pub use ring_buffer::{BinFrame, FrameRing, RingBuffer};
pub use table::{sine_table, LookupTable, Waveform, SINE_TABLE_SIZE};
pub use types::*;
pub use window::{generate_window, WindowType};
