use crate::apu::Apu;
use crate::cartridge::Mapper;
use crate::clock::{CLK_1, Clock};
use crate::cpu::{Bus, Cpu, Peek, Poke, PpuReg};
use crate::joypad::Pads;
use crate::ppu::{CpuLink, Ppu, RP2C02_CC, RP2C02_HVINT};

/// Everything on the CPU bus besides RAM: the PPU and APU registers, the
/// controller ports and the cartridge.
pub struct MemController {
    pub ppu: Ppu,
    pub apu: Apu,
    pub pads: Pads,
    pub mapper: Box<dyn Mapper>,
}

/// The CPU as the PPU sees it during a register access: catching up means
/// letting pending DMC fetches steal their cycles first
struct SyncContext<'a> {
    cpu: &'a mut Cpu,
    apu: &'a mut Apu,
    mapper: &'a mut dyn Mapper,
}

impl CpuLink for SyncContext<'_> {
    fn cpu(&mut self) -> &mut Cpu {
        self.cpu
    }

    fn update(&mut self) -> Clock {
        let clk = self.cpu.current_clock();
        self.apu.clock_dma(self.cpu, self.mapper, clk);
        self.cpu.current_clock()
    }
}

impl MemController {
    pub fn new(ppu: Ppu, apu: Apu, pads: Pads, mapper: Box<dyn Mapper>) -> Self {
        Self {
            ppu,
            apu,
            pads,
            mapper,
        }
    }

    /// Bring the PPU up to the CPU clock plus `data_setup`
    fn sync_ppu(&mut self, cpu: &mut Cpu, data_setup: Clock) {
        let mut link = SyncContext {
            cpu,
            apu: &mut self.apu,
            mapper: self.mapper.as_mut(),
        };
        self.ppu.update(&mut link, data_setup);
    }

    /// $4014: copy a 256-byte page into OAM, stalling the CPU 513 or 514
    /// cycles
    fn oam_dma(&mut self, cpu: &mut Cpu, data: u8) {
        if cpu.odd_clock() {
            cpu.steal_clocks(CLK_1);
        }
        self.sync_ppu(cpu, RP2C02_CC);
        cpu.steal_clocks(CLK_1);

        let mut addr = (data as u16) << 8;
        let fast = self.ppu.oam_address() == 0
            && addr < 0x2000
            && (!self.ppu.any_show() || cpu.current_clock() <= RP2C02_HVINT - CLK_1 * 512);
        if fast {
            cpu.steal_clocks(CLK_1 * 512);
            let start = (addr & 0x7ff) as usize;
            self.ppu.oam_dma_page(&cpu.ram()[start..start + 256]);
            return;
        }

        loop {
            let value = cpu.fetch(self, addr);
            addr = addr.wrapping_add(1);
            cpu.steal_clocks(CLK_1);
            self.sync_ppu(cpu, RP2C02_CC);
            cpu.steal_clocks(CLK_1);
            self.ppu.oam_dma_write(value);
            if addr & 0xff == 0 {
                break;
            }
        }
    }
}

impl Bus for MemController {
    fn peek(&mut self, cpu: &mut Cpu, handler: Peek, addr: u16) -> u8 {
        match handler {
            Peek::Ppu(reg) => {
                let mut link = SyncContext {
                    cpu,
                    apu: &mut self.apu,
                    mapper: self.mapper.as_mut(),
                };
                self.ppu.peek(&mut link, reg)
            }
            Peek::Apu(reg) => self.apu.peek(cpu, self.mapper.as_mut(), reg),
            Peek::Pad(port) => {
                let clk = cpu.current_clock();
                self.apu.clock_dma(cpu, self.mapper.as_mut(), clk);
                self.pads.peek(port)
            }
            Peek::Cartridge => self.mapper.read_prg(addr),
            // handled by the CPU itself
            Peek::Ram | Peek::RamMirror | Peek::OpenBus | Peek::JamLow | Peek::JamHigh => {
                (addr >> 8) as u8
            }
        }
    }

    fn poke(&mut self, cpu: &mut Cpu, handler: Poke, addr: u16, data: u8) {
        match handler {
            Poke::Ppu(PpuReg::OamDma) => self.oam_dma(cpu, data),
            Poke::Ppu(reg) => {
                let mut link = SyncContext {
                    cpu,
                    apu: &mut self.apu,
                    mapper: self.mapper.as_mut(),
                };
                self.ppu.poke(&mut link, reg, data);
            }
            Poke::Apu(reg) => self.apu.poke(cpu, self.mapper.as_mut(), reg, data),
            Poke::PadStrobe => self.pads.poke_strobe(data),
            Poke::Cartridge => self.mapper.write_prg(addr, data),
            Poke::Nop | Poke::Ram | Poke::RamMirror => {}
        }
    }

    fn next_event_clock(&mut self, cpu: &mut Cpu) -> Clock {
        self.apu.next_event_clock(cpu, self.mapper.as_mut())
    }
}
