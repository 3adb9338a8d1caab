//! Cycle-accurate NES emulator core with an SDL2 frontend.
//!
//! [`Nes`] is the whole console. Build it from a [`Config`] and an iNES
//! image, then call [`Nes::step`] once per video frame.

pub mod apu;
pub mod audio;
pub mod cartridge;
pub mod clock;
pub mod config;
pub mod cpu;
pub mod error;
pub mod eventloop;
pub mod joypad;
pub mod mem_controller;
pub mod nes;
pub mod palette;
pub mod ppu;
pub mod screen_buffer;

pub use config::Config;
pub use error::{Error, Result};
pub use nes::Nes;
