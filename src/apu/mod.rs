//! RP2A03 audio processing unit.
//!
//! Two pulse channels, a triangle, a noise generator and the delta
//! modulation channel, mixed down to signed 16-bit mono samples.

#[allow(clippy::module_inception)]
mod apu;
pub mod dmc;
pub mod envelope;
pub mod frame_counter;
pub mod length_counter;
pub mod mixer;
pub mod noise;
mod oscillator;
pub mod pulse;
pub mod triangle;

pub use apu::Apu;

/// Channel output scale
pub const CHANNEL_OUTPUT_MUL: i64 = 256;

/// Per-sample fade applied to a channel that was just silenced
pub const CHANNEL_OUTPUT_DECAY: i64 = CHANNEL_OUTPUT_MUL / 4 - 1;
