use crate::clock::Clock;

use super::Cpu;

/// PPU registers reachable from the CPU bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PpuReg {
    /// $2000 PPUCTRL
    Ctrl,
    /// $2001 PPUMASK
    Mask,
    /// $2002 PPUSTATUS
    Status,
    /// $2003 OAMADDR
    OamAddr,
    /// $2004 OAMDATA
    OamData,
    /// $2005 PPUSCROLL
    Scroll,
    /// $2006 PPUADDR
    Addr,
    /// $2007 PPUDATA
    Data,
    /// Any register whose other direction only touches the I/O latch
    Latch,
    /// $3000 read: catch up, then return the latch. The interrupt sequence
    /// issues this read when it lands past the frame end.
    SyncLatch,
    /// $4014 OAMDMA
    OamDma,
}

/// APU registers reachable from the CPU bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApuReg {
    /// $4000-$4007, pulse channel `n` register `r`
    Pulse(usize, u8),
    /// $4008-$400B
    Triangle(u8),
    /// $400C-$400F
    Noise(u8),
    /// $4010-$4013
    Dmc(u8),
    /// $4015
    Status,
    /// $4017 (write side, routed through the pad port)
    FrameCounter,
    /// Write-only registers read back as 0x40
    Open,
}

/// Read handler installed for one address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Peek {
    Ram,
    RamMirror,
    /// Unmapped: the high byte of the address floats on the bus
    OpenBus,
    /// Reset vector low byte before a cartridge is mapped; freezes the PC
    JamLow,
    /// Reset vector high byte before a cartridge is mapped
    JamHigh,
    Ppu(PpuReg),
    Apu(ApuReg),
    Pad(usize),
    Cartridge,
}

/// Write handler installed for one address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Poke {
    Nop,
    Ram,
    RamMirror,
    Ppu(PpuReg),
    Apu(ApuReg),
    PadStrobe,
    Cartridge,
}

/// Everything on the CPU bus that the CPU does not own itself.
///
/// The CPU resolves RAM and open-bus handlers on its own and forwards every
/// other handler here, lending itself so the device can read the current
/// clock, steal cycles, or schedule interrupts.
pub trait Bus {
    /// Read through a device handler
    fn peek(&mut self, cpu: &mut Cpu, handler: Peek, addr: u16) -> u8;

    /// Write through a device handler
    fn poke(&mut self, cpu: &mut Cpu, handler: Poke, addr: u16, data: u8);

    /// Clock of the next event a device has scheduled (DMC fetch, frame IRQ)
    fn next_event_clock(&mut self, cpu: &mut Cpu) -> Clock;
}
