//! RP2C02 picture processing unit.
//!
//! The PPU is driven lazily: it only advances when a register access or the
//! end of the frame asks it to catch up with the CPU clock. Its scanline
//! walk is an explicit state machine keyed by the horizontal clock, so it
//! can stop at any dot and resume there on the next call.

mod background;
mod memory;
#[allow(clippy::module_inception)]
mod ppu;
mod registers;
mod sprites;
mod status;
mod timing;

pub use ppu::Ppu;

use crate::clock::Clock;
use crate::cpu::Cpu;

pub const SCREEN_WIDTH: usize = 256;
pub const SCREEN_HEIGHT: usize = 240;

pub const RP2C02_CC: Clock = crate::clock::RP2C02_CC;
pub const RP2C02_HACTIVE: Clock = RP2C02_CC * 256;
pub const RP2C02_HBLANK: Clock = RP2C02_CC * 85;
pub const RP2C02_HSYNC: Clock = RP2C02_HACTIVE + RP2C02_HBLANK;
pub const RP2C02_VACTIVE: Clock = 240;
pub const RP2C02_VSLEEP: Clock = 1;
pub const RP2C02_VINT: Clock = 20;
pub const RP2C02_VDUMMY: Clock = 1;
pub const RP2C02_VBLANK: Clock = RP2C02_VSLEEP + RP2C02_VINT + RP2C02_VDUMMY;
pub const RP2C02_VSYNC: Clock = RP2C02_VACTIVE + RP2C02_VBLANK;
/// End of the power-on frame
pub const RP2C02_HVSYNCBOOT: Clock = RP2C02_VACTIVE * RP2C02_HSYNC + RP2C02_CC * 312;
/// End of vertical blanking, measured from the start of a frame
pub const RP2C02_HVINT: Clock = RP2C02_VINT * RP2C02_HSYNC;
/// Length of an even frame
pub const RP2C02_HVSYNC_0: Clock = RP2C02_VSYNC * RP2C02_HSYNC;
/// Length of an odd frame with rendering on (one dot skipped)
pub const RP2C02_HVSYNC_1: Clock = RP2C02_VSYNC * RP2C02_HSYNC - RP2C02_CC;

/// What a register handler needs from the CPU side of the bus.
///
/// `update` brings the CPU side up to date (pending DMC fetches included)
/// and returns the clock the access happens at.
pub trait CpuLink {
    fn cpu(&mut self) -> &mut Cpu;

    fn update(&mut self) -> Clock;
}

impl CpuLink for Cpu {
    fn cpu(&mut self) -> &mut Cpu {
        self
    }

    fn update(&mut self) -> Clock {
        self.current_clock()
    }
}

