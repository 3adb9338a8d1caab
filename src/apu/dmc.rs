//! Delta modulation channel.
//!
//! The DMC pulls its sample bytes from cartridge space on its own, stalling
//! the CPU for every byte it fetches.

use crate::cartridge::Mapper;
use crate::clock::{Clock, RP2A03_CC};
use crate::cpu::{Cpu, Irq};

use super::CHANNEL_OUTPUT_MUL;

/// Output periods in master clocks, indexed by $4010 bits 0-3
pub const DMC_PERIOD_TABLE: [Clock; 16] = {
    let cycles = [
        428, 380, 340, 320, 286, 254, 226, 214, 190, 160, 142, 128, 106, 84, 72, 54,
    ];
    let mut table = [0; 16];
    let mut i = 0;
    while i < 16 {
        table[i] = cycles[i] * RP2A03_CC;
        i += 1;
    }
    table
};

pub struct Dmc {
    cur_sample: Clock,
    lin_sample: Clock,
    freq: Clock,
    loop_flag: bool,
    irq_enable: bool,
    regs_length_counter: u16,
    regs_address: u16,

    out_active: bool,
    out_shifter: u8,
    out_dac: u8,
    out_buffer: u8,

    dma_length_counter: u16,
    dma_buffered: bool,
    dma_address: u16,
    dma_buffer: u8,
}

impl Default for Dmc {
    fn default() -> Self {
        Self::new()
    }
}

impl Dmc {
    pub fn new() -> Self {
        let mut dmc = Self {
            cur_sample: 0,
            lin_sample: 0,
            freq: DMC_PERIOD_TABLE[0],
            loop_flag: false,
            irq_enable: false,
            regs_length_counter: 1,
            regs_address: 0xc000,
            out_active: false,
            out_shifter: 0,
            out_dac: 0,
            out_buffer: 0,
            dma_length_counter: 0,
            dma_buffered: false,
            dma_address: 0xc000,
            dma_buffer: 0,
        };
        dmc.reset();
        dmc
    }

    pub fn reset(&mut self) {
        self.cur_sample = 0;
        self.lin_sample = 0;
        self.freq = DMC_PERIOD_TABLE[0];
        self.loop_flag = false;
        self.irq_enable = false;
        self.regs_length_counter = 1;
        self.regs_address = 0xc000;
        self.out_active = false;
        self.out_shifter = 0;
        self.out_dac = 0;
        self.out_buffer = 0;
        self.dma_length_counter = 0;
        self.dma_buffered = false;
        self.dma_address = 0xc000;
        self.dma_buffer = 0;
    }

    /// Master clocks between two output bits
    pub fn freq(&self) -> Clock {
        self.freq
    }

    /// $4015 write bit 4
    pub fn enable(&mut self, cpu: &mut Cpu, mapper: &mut dyn Mapper, enabled: bool) {
        cpu.clear_irq(Irq::DMC);
        if !enabled {
            self.dma_length_counter = 0;
        } else if self.dma_length_counter == 0 {
            self.dma_length_counter = self.regs_length_counter;
            self.dma_address = self.regs_address;
            if !self.dma_buffered {
                self.do_dma(cpu, mapper);
            }
        }
    }

    /// $4015 read bit 4
    pub fn status(&self) -> bool {
        self.dma_length_counter > 0
    }

    /// Output level, slewed toward the DAC value to soften clicks
    pub fn sample(&mut self) -> Clock {
        if self.cur_sample != self.lin_sample {
            let step = CHANNEL_OUTPUT_MUL * 8;
            if self.lin_sample + step < self.cur_sample {
                self.lin_sample += step;
            } else if self.cur_sample < self.lin_sample - step {
                self.lin_sample -= step;
            } else {
                self.lin_sample = self.cur_sample;
            }
        }
        self.lin_sample
    }

    fn do_dma(&mut self, cpu: &mut Cpu, mapper: &mut dyn Mapper) {
        self.dma_buffer = cpu.dmc_dma(mapper, self.dma_address);
        self.dma_address = 0x8000 | (self.dma_address.wrapping_add(1) & 0x7fff);
        self.dma_buffered = true;
        self.dma_length_counter -= 1;
        if self.dma_length_counter == 0 {
            if self.loop_flag {
                self.dma_address = self.regs_address;
                self.dma_length_counter = self.regs_length_counter;
            } else if self.irq_enable {
                cpu.request_irq(Irq::DMC, cpu.current_clock());
            }
        }
    }

    /// Latch the DAC as the current output level
    pub fn update(&mut self) {
        self.cur_sample = self.out_dac as Clock * CHANNEL_OUTPUT_MUL;
    }

    /// $4010: IRQ enable, loop, rate
    pub fn write_control(&mut self, cpu: &mut Cpu, data: u8) {
        self.loop_flag = data & 0x40 != 0;
        self.irq_enable = data & 0x80 != 0;
        self.freq = DMC_PERIOD_TABLE[(data & 0x0f) as usize];
        if !self.irq_enable {
            cpu.clear_irq(Irq::DMC);
        }
    }

    /// $4011: direct load
    pub fn write_dac(&mut self, data: u8) {
        self.out_dac = data & 0x7f;
        self.update();
    }

    /// $4012: sample address = $C000 + data * 64
    pub fn write_address(&mut self, data: u8) {
        self.regs_address = 0xc000 | ((data as u16) << 6);
    }

    /// $4013: sample length = data * 16 + 1
    pub fn write_length(&mut self, data: u8) {
        self.regs_length_counter = ((data as u16) << 4) + 1;
    }

    /// Shift one bit into the DAC; true when the level changed
    pub fn clock_dac(&mut self) -> bool {
        if self.out_active {
            let n = self.out_dac as i16 + ((self.out_buffer & 1) << 2) as i16 - 2;
            self.out_buffer >>= 1;
            if (0..=0x7f).contains(&n) && n != self.out_dac as i16 {
                self.out_dac = n as u8;
                return true;
            }
        }
        false
    }

    /// Advance the output unit, refilling from memory after every 8 bits
    pub fn clock_dma(&mut self, cpu: &mut Cpu, mapper: &mut dyn Mapper) {
        if self.out_shifter == 0 {
            self.out_shifter = 7;
            self.out_active = self.dma_buffered;
            if self.out_active {
                self.dma_buffered = false;
                self.out_buffer = self.dma_buffer;
                if self.dma_length_counter != 0 {
                    self.do_dma(cpu, mapper);
                }
            }
        } else {
            self.out_shifter -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::{MirroringMode, NROMMapper};
    use crate::clock::CLK_4;

    fn mapper_with(fill: u8) -> NROMMapper {
        NROMMapper::new(vec![fill; 0x4000], vec![0; 0x2000], MirroringMode::Horizontal)
    }

    #[test]
    fn test_enable_fetches_first_byte() {
        let mut cpu = Cpu::new();
        let mut mapper = mapper_with(0xff);
        let mut dmc = Dmc::new();
        dmc.write_length(0);
        let before = cpu.current_clock();
        dmc.enable(&mut cpu, &mut mapper, true);
        // one byte sample: fetched and finished
        assert_eq!(cpu.current_clock() - before, CLK_4);
        assert!(!dmc.status());
        assert!(dmc.dma_buffered);
        assert_eq!(dmc.dma_buffer, 0xff);
    }

    #[test]
    fn test_irq_on_sample_end() {
        let mut cpu = Cpu::new();
        let mut mapper = mapper_with(0);
        let mut dmc = Dmc::new();
        dmc.write_control(&mut cpu, 0x80);
        dmc.write_length(0);
        dmc.enable(&mut cpu, &mut mapper, true);
        assert_eq!(cpu.irq_flags(), Irq::DMC);

        // disabling the IRQ drops the pending line
        dmc.write_control(&mut cpu, 0x00);
        assert!(cpu.irq_flags().is_empty());
    }

    #[test]
    fn test_loop_restarts_sample() {
        let mut cpu = Cpu::new();
        let mut mapper = mapper_with(0);
        let mut dmc = Dmc::new();
        dmc.write_control(&mut cpu, 0xc0);
        dmc.write_address(0x10);
        dmc.write_length(0);
        dmc.enable(&mut cpu, &mut mapper, true);
        assert!(dmc.status());
        assert_eq!(dmc.dma_address, 0xc400);
        assert!(cpu.irq_flags().is_empty());
    }

    #[test]
    fn test_dac_ramps_with_bits() {
        let mut cpu = Cpu::new();
        let mut mapper = mapper_with(0xff);
        let mut dmc = Dmc::new();
        dmc.write_dac(0x40);
        dmc.write_length(0);
        dmc.enable(&mut cpu, &mut mapper, true);
        dmc.clock_dma(&mut cpu, &mut mapper);
        for i in 1..=8 {
            assert!(dmc.clock_dac());
            assert_eq!(dmc.out_dac, 0x40 + 2 * i);
            dmc.clock_dma(&mut cpu, &mut mapper);
        }
    }

    #[test]
    fn test_dac_clamps_at_top() {
        let mut dmc = Dmc::new();
        dmc.write_dac(0x7f);
        dmc.out_active = true;
        dmc.out_buffer = 0xff;
        assert!(!dmc.clock_dac());
        assert_eq!(dmc.out_dac, 0x7f);
    }

    #[test]
    fn test_sample_slews_toward_dac() {
        let mut dmc = Dmc::new();
        dmc.write_dac(0x7f);
        let target = 0x7f * CHANNEL_OUTPUT_MUL;
        let first = dmc.sample();
        assert_eq!(first, CHANNEL_OUTPUT_MUL * 8);
        let mut last = first;
        for _ in 0..100 {
            last = dmc.sample();
        }
        assert_eq!(last, target);
    }
}
