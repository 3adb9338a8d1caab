//! 6502 core of the RP2A03.
//!
//! The CPU owns the master clock. It runs instructions until the nearest
//! scheduled event (frame end, NMI, IRQ or an APU deadline) and lets the
//! devices on the [`Bus`] catch up lazily whenever one of their registers is
//! touched.

mod addressing;
pub mod decoder;
pub mod memory_map;
mod operations;

use std::ops::RangeInclusive;

use bitflags::bitflags;
use tracing::{debug, trace};

use crate::cartridge::Mapper;
use crate::clock::{CLK_1, CLK_2, CLK_3, CLK_7, Clock, FOREVER_CLOCK};
use decoder::{DISPATCH, Instruction};
pub use memory_map::{ApuReg, Bus, Peek, Poke, PpuReg};

pub const NMI_VECTOR: u16 = 0xfffa;
pub const RESET_VECTOR: u16 = 0xfffc;
pub const IRQ_VECTOR: u16 = 0xfffe;

const RAM_SIZE: usize = 0x800;

bitflags! {
    /// IRQ sources sharing the single IRQ line
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Irq: u8 {
        /// Cartridge hardware
        const EXT = 0x01;
        /// APU frame sequencer
        const FRAME = 0x40;
        /// APU delta modulation channel
        const DMC = 0x80;
    }
}

/// RP2A03 CPU state
pub struct Cpu {
    a: u8,
    x: u8,
    y: u8,
    sp: u8,
    pc: u16,

    // Flags are kept decomposed. `p_nz` holds the last result for N and Z
    // (bit 7 or bit 8 set means negative, low byte zero means zero).
    p_nz: u16,
    p_c: u8,
    p_v: u8,
    p_i: u8,
    p_d: u8,

    // Operand scratch, valid only while an instruction executes
    addr: u16,
    data: u8,

    clk: Clock,
    clk_frame: Clock,
    clk_target: Clock,
    clk_nmi: Clock,
    clk_irq: Clock,
    clk_total: Clock,

    irq_flags: Irq,
    jammed: bool,

    ram: [u8; RAM_SIZE],
    peeks: Vec<Peek>,
    pokes: Vec<Poke>,
}

impl Cpu {
    /// Create a CPU in its power-on state with the default memory map
    pub fn new() -> Self {
        let mut cpu = Self {
            a: 0,
            x: 0,
            y: 0,
            sp: 0,
            pc: 0,
            p_nz: 0,
            p_c: 0,
            p_v: 0,
            p_i: 0,
            p_d: 0,
            addr: 0,
            data: 0,
            clk: 0,
            clk_frame: 0,
            clk_target: 0,
            clk_nmi: FOREVER_CLOCK,
            clk_irq: FOREVER_CLOCK,
            clk_total: 0,
            irq_flags: Irq::empty(),
            jammed: false,
            ram: [0; RAM_SIZE],
            peeks: vec![Peek::OpenBus; 0x10000],
            pokes: vec![Poke::Nop; 0x10000],
        };
        cpu.reset();
        cpu
    }

    /// Reset registers, clocks and RAM, and install the CPU's own mappings.
    ///
    /// Devices install their registers afterwards; the reset vector reads as
    /// a jam until a cartridge claims it.
    pub fn reset(&mut self) {
        self.a = 0;
        self.x = 0;
        self.y = 0;
        self.sp = 0xfd;
        self.pc = RESET_VECTOR;

        self.p_nz = 1;
        self.p_c = 0;
        self.p_v = 0;
        self.p_i = 0x04;
        self.p_d = 0;

        self.clk = 0;
        self.clk_total = 0;
        self.clk_nmi = FOREVER_CLOCK;
        self.clk_irq = FOREVER_CLOCK;
        self.irq_flags = Irq::empty();
        self.jammed = false;

        self.ram.fill(0xff);

        self.add_mappings(0x0000..=0x07ff, Peek::Ram, Poke::Ram);
        self.add_mappings(0x0800..=0x1fff, Peek::RamMirror, Poke::RamMirror);
        self.add_mappings(0x2000..=0xffff, Peek::OpenBus, Poke::Nop);
        self.add_mappings(0xfffc..=0xfffc, Peek::JamLow, Poke::Nop);
        self.add_mappings(0xfffd..=0xfffd, Peek::JamHigh, Poke::Nop);
        debug!("cpu reset");
    }

    /// Consume the 7 reset cycles and jump through the reset vector
    pub fn boot<B: Bus>(&mut self, bus: &mut B) {
        self.clk = CLK_7;
        self.pc = self.peek16(bus, RESET_VECTOR);
        debug!("cpu boot: pc=0x{:04x}", self.pc);
    }

    /// Rebase every clock onto the next frame
    pub fn vsync(&mut self) {
        self.clk -= self.clk_frame;
        self.clk_total += self.clk_frame;

        if self.clk_nmi != FOREVER_CLOCK {
            self.clk_nmi -= self.clk_frame;
        }
        if self.clk_irq != FOREVER_CLOCK {
            self.clk_irq -= self.clk_frame;
        }
        if self.clk_irq < 0 {
            self.clk_irq = 0;
        }
    }

    // ---------------------------------------------------------------------
    // memory map

    /// Install a handler pair for every address in `addrs`
    pub fn add_mappings<I>(&mut self, addrs: I, peek: Peek, poke: Poke)
    where
        I: IntoIterator<Item = u16>,
    {
        for addr in addrs {
            self.peeks[addr as usize] = peek;
            self.pokes[addr as usize] = poke;
        }
    }

    /// Install one handler pair over an inclusive range, every `step` bytes
    pub fn add_mappings_step(
        &mut self,
        range: RangeInclusive<u16>,
        step: usize,
        peek: Peek,
        poke: Poke,
    ) {
        self.add_mappings(range.step_by(step), peek, poke);
    }

    /// Read handler currently installed at `addr`
    pub fn peek_handler(&self, addr: u16) -> Peek {
        self.peeks[addr as usize]
    }

    /// Write handler currently installed at `addr`
    pub fn poke_handler(&self, addr: u16) -> Poke {
        self.pokes[addr as usize]
    }

    /// Read a byte through the memory map
    pub fn fetch<B: Bus + ?Sized>(&mut self, bus: &mut B, addr: u16) -> u8 {
        match self.peeks[addr as usize] {
            Peek::Ram => self.ram[addr as usize],
            Peek::RamMirror => self.ram[addr as usize % RAM_SIZE],
            Peek::OpenBus => (addr >> 8) as u8,
            Peek::JamLow => {
                self.pc = self.pc.wrapping_sub(1);
                0xfc
            }
            Peek::JamHigh => 0xff,
            handler => bus.peek(self, handler, addr),
        }
    }

    /// Write a byte through the memory map
    pub fn store<B: Bus + ?Sized>(&mut self, bus: &mut B, addr: u16, data: u8) {
        match self.pokes[addr as usize] {
            Poke::Nop => {}
            Poke::Ram => self.ram[addr as usize] = data,
            Poke::RamMirror => self.ram[addr as usize % RAM_SIZE] = data,
            handler => bus.poke(self, handler, addr, data),
        }
    }

    /// Read a little-endian word through the memory map
    pub fn peek16<B: Bus + ?Sized>(&mut self, bus: &mut B, addr: u16) -> u16 {
        let lo = self.fetch(bus, addr) as u16;
        let hi = self.fetch(bus, addr.wrapping_add(1)) as u16;
        lo | hi << 8
    }

    /// Internal RAM
    pub fn ram(&self) -> &[u8; RAM_SIZE] {
        &self.ram
    }

    /// Internal RAM, for loaders and tests
    pub fn ram_mut(&mut self) -> &mut [u8; RAM_SIZE] {
        &mut self.ram
    }

    // ---------------------------------------------------------------------
    // clocks

    pub fn current_clock(&self) -> Clock {
        self.clk
    }

    /// Clocks elapsed before the current frame
    pub fn total_clock(&self) -> Clock {
        self.clk_total
    }

    pub fn next_frame_clock(&self) -> Clock {
        self.clk_frame
    }

    /// Move the frame end; an earlier end also stops the current run sooner
    pub fn set_next_frame_clock(&mut self, clk: Clock) {
        self.clk_frame = clk;
        if clk < self.clk_target {
            self.clk_target = clk;
        }
    }

    /// Stall the CPU for `clk` master clocks (DMA)
    pub fn steal_clocks(&mut self, clk: Clock) {
        self.clk += clk;
    }

    /// Whether the CPU sits on an odd cycle
    pub fn odd_clock(&self) -> bool {
        (self.clk_total + self.clk) % CLK_2 != 0
    }

    /// Fetch one DMC sample byte from cartridge space.
    ///
    /// This always steals 4 cycles; real hardware steals 1 to 4 depending on
    /// what the CPU is doing at the time.
    pub fn dmc_dma(&mut self, mapper: &mut dyn Mapper, addr: u16) -> u8 {
        self.clk += CLK_3;
        let data = mapper.read_prg(addr);
        self.clk += CLK_1;
        data
    }

    // ---------------------------------------------------------------------
    // interrupts

    /// Whether the CPU hit a jam opcode
    pub fn is_jammed(&self) -> bool {
        self.jammed
    }

    /// Clock the next NMI is scheduled at, if any
    pub fn scheduled_nmi(&self) -> Option<Clock> {
        (self.clk_nmi != FOREVER_CLOCK).then_some(self.clk_nmi)
    }

    /// Clock the next IRQ is scheduled at, if any
    pub fn scheduled_irq(&self) -> Option<Clock> {
        (self.clk_irq != FOREVER_CLOCK).then_some(self.clk_irq)
    }

    /// Pending IRQ sources
    pub fn irq_flags(&self) -> Irq {
        self.irq_flags
    }

    /// Drop IRQ `line`; returns the frame and DMC bits as they were before
    pub fn clear_irq(&mut self, line: Irq) -> u8 {
        let old = (self.irq_flags & (Irq::FRAME | Irq::DMC)).bits();
        self.irq_flags.remove(line);
        if self.irq_flags.is_empty() {
            self.clk_irq = FOREVER_CLOCK;
        }
        old
    }

    fn next_interrupt_clock(&mut self, clk: Clock) -> Clock {
        // the interrupt line is sampled half a cycle into the next instruction
        let clk = clk + CLK_1 + CLK_1 / 2;
        if self.clk_target > clk {
            self.clk_target = clk;
        }
        clk
    }

    /// Raise IRQ `line` at `clk`
    pub fn request_irq(&mut self, line: Irq, clk: Clock) {
        self.irq_flags |= line;
        if self.clk_irq == FOREVER_CLOCK && self.p_i == 0 {
            self.clk_irq = self.next_interrupt_clock(clk);
        }
    }

    /// Raise NMI at `clk` unless one is already scheduled
    pub fn request_nmi(&mut self, clk: Clock) {
        if self.clk_nmi == FOREVER_CLOCK {
            self.clk_nmi = self.next_interrupt_clock(clk);
        }
    }

    fn do_isr<B: Bus>(&mut self, bus: &mut B, vector: u16) {
        if self.jammed {
            return;
        }
        self.push16(self.pc);
        let flags = self.flags_pack();
        self.push8(flags);
        self.p_i = 0x04;
        self.clk += CLK_7;
        let addr = if vector == NMI_VECTOR {
            NMI_VECTOR
        } else {
            self.fetch_irq_isr_vector(bus)
        };
        self.pc = self.peek16(bus, addr);
    }

    /// An NMI that arrives during an IRQ/BRK sequence hijacks its vector
    fn fetch_irq_isr_vector<B: Bus>(&mut self, bus: &mut B) -> u16 {
        if self.clk >= self.clk_frame {
            self.fetch(bus, 0x3000);
        }
        if self.clk_nmi != FOREVER_CLOCK {
            if self.clk_nmi + CLK_2 <= self.clk {
                self.clk_nmi = FOREVER_CLOCK;
                return NMI_VECTOR;
            }
            self.clk_nmi = self.clk + 1;
        }
        IRQ_VECTOR
    }

    // ---------------------------------------------------------------------
    // status register

    /// Pack the flags into NV1BDIZC form (B clear)
    pub fn flags_pack(&self) -> u8 {
        let n = ((self.p_nz | self.p_nz >> 1) & 0x80) as u8;
        let z = if self.p_nz & 0xff != 0 { 0 } else { 0x02 };
        let v = if self.p_v != 0 { 0x40 } else { 0 };
        n | z | self.p_c | v | self.p_i | self.p_d | 0x20
    }

    /// Load the flags from a packed byte
    pub fn flags_unpack(&mut self, f: u8) {
        let f16 = f as u16;
        self.p_nz = (!f16 & 0x02) | ((f16 & 0x80) << 1);
        self.p_c = f & 0x01;
        self.p_v = f & 0x40;
        self.p_i = f & 0x04;
        self.p_d = f & 0x08;
    }

    // ---------------------------------------------------------------------
    // registers

    pub fn get_pc(&self) -> u16 {
        self.pc
    }

    pub fn set_pc(&mut self, pc: u16) {
        self.pc = pc;
    }

    pub fn get_a(&self) -> u8 {
        self.a
    }

    pub fn get_x(&self) -> u8 {
        self.x
    }

    pub fn get_y(&self) -> u8 {
        self.y
    }

    pub fn get_sp(&self) -> u8 {
        self.sp
    }

    // ---------------------------------------------------------------------
    // stack

    fn push8(&mut self, data: u8) {
        self.ram[0x100 + self.sp as usize] = data;
        self.sp = self.sp.wrapping_sub(1);
    }

    fn push16(&mut self, data: u16) {
        self.push8((data >> 8) as u8);
        self.push8(data as u8);
    }

    fn pull8(&mut self) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        self.ram[0x100 + self.sp as usize]
    }

    fn pull16(&mut self) -> u16 {
        let lo = self.pull8() as u16;
        let hi = self.pull8() as u16;
        lo | hi << 8
    }

    // ---------------------------------------------------------------------
    // main loop

    /// Pick the next stopping clock and serve interrupts that are due
    fn do_clock<B: Bus>(&mut self, bus: &mut B) {
        let mut clock = bus.next_event_clock(self).min(self.clk_frame);

        if self.clk < self.clk_nmi {
            clock = clock.min(self.clk_nmi);
            if self.clk < self.clk_irq {
                clock = clock.min(self.clk_irq);
            } else {
                self.clk_irq = FOREVER_CLOCK;
                self.do_isr(bus, IRQ_VECTOR);
            }
        } else {
            self.clk_nmi = FOREVER_CLOCK;
            self.clk_irq = FOREVER_CLOCK;
            self.do_isr(bus, NMI_VECTOR);
        }
        self.clk_target = clock;
    }

    /// Run until the frame end clock
    pub fn run<B: Bus>(&mut self, bus: &mut B) {
        self.do_clock(bus);
        loop {
            loop {
                let opcode = self.fetch(bus, self.pc);
                trace!(
                    "PC:{:04X} A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X} CYC:{:3} : OPCODE:{:02X} ({}, {})",
                    self.pc,
                    self.a,
                    self.x,
                    self.y,
                    self.flags_pack(),
                    self.sp,
                    self.clk / 4 % 341,
                    opcode,
                    self.clk,
                    self.clk_target
                );
                self.pc = self.pc.wrapping_add(1);
                self.execute(bus, DISPATCH[opcode as usize]);
                if self.clk >= self.clk_target {
                    break;
                }
            }
            self.do_clock(bus);
            if self.clk >= self.clk_frame {
                break;
            }
        }
    }

    fn execute<B: Bus>(&mut self, bus: &mut B, instruction: Instruction) {
        match instruction {
            Instruction::Read(op, mode) => {
                self.address(bus, mode, true, false);
                self.operate(bus, op);
            }
            Instruction::Write(op, mode) => {
                self.address(bus, mode, false, true);
                self.operate(bus, op);
                self.store_back(bus, mode);
            }
            Instruction::ReadWrite(op, mode) => {
                self.address(bus, mode, true, true);
                self.operate(bus, op);
                self.store_back(bus, mode);
            }
            Instruction::Accumulator(op) => {
                self.clk += CLK_2;
                self.data = self.a;
                self.operate(bus, op);
                self.a = self.data;
            }
            Instruction::Implied(op) => self.operate(bus, op),
            Instruction::Skip { operands, cycles } => {
                self.pc = self.pc.wrapping_add(operands);
                self.clk += cycles * CLK_1;
            }
        }
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}
