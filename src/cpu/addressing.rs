//! Addressing modes.
//!
//! Each mode leaves the effective address in `addr` and, when the
//! instruction reads, the operand in `data`. Cycle costs are charged here,
//! including the dummy reads real hardware performs on page crossings.

use crate::clock::{CLK_1, CLK_2, CLK_3, CLK_4, CLK_5};

use super::decoder::Mode;
use super::{Bus, Cpu};

impl Cpu {
    pub(super) fn address<B: Bus>(&mut self, bus: &mut B, mode: Mode, read: bool, write: bool) {
        match mode {
            Mode::Imm => self.imm(bus),
            Mode::Zpg => self.zpg(bus, read, write),
            Mode::ZpgX => self.zpg_reg(bus, self.x, read, write),
            Mode::ZpgY => self.zpg_reg(bus, self.y, read, write),
            Mode::Abs => self.abs(bus, read, write),
            Mode::AbsX => self.abs_reg(bus, self.x, read, write),
            Mode::AbsY => self.abs_reg(bus, self.y, read, write),
            Mode::IndX => self.ind_x(bus, read, write),
            Mode::IndY => self.ind_y(bus, read, write),
        }
    }

    /// Write `data` back to the operand address
    pub(super) fn store_back<B: Bus>(&mut self, bus: &mut B, mode: Mode) {
        if mode.is_zero_page() {
            self.ram[self.addr as usize] = self.data;
        } else {
            self.store(bus, self.addr, self.data);
            self.clk += CLK_1;
        }
    }

    fn imm<B: Bus>(&mut self, bus: &mut B) {
        self.data = self.fetch(bus, self.pc);
        self.pc = self.pc.wrapping_add(1);
        self.clk += CLK_2;
    }

    fn zpg<B: Bus>(&mut self, bus: &mut B, read: bool, write: bool) {
        self.addr = self.fetch(bus, self.pc) as u16;
        self.pc = self.pc.wrapping_add(1);
        self.clk += CLK_3;
        if read {
            self.data = self.ram[self.addr as usize];
            if write {
                self.clk += CLK_2;
            }
        }
    }

    fn zpg_reg<B: Bus>(&mut self, bus: &mut B, indexed: u8, read: bool, write: bool) {
        self.addr = indexed.wrapping_add(self.fetch(bus, self.pc)) as u16;
        self.pc = self.pc.wrapping_add(1);
        self.clk += CLK_4;
        if read {
            self.data = self.ram[self.addr as usize];
            if write {
                self.clk += CLK_2;
            }
        }
    }

    fn abs<B: Bus>(&mut self, bus: &mut B, read: bool, write: bool) {
        self.addr = self.peek16(bus, self.pc);
        self.pc = self.pc.wrapping_add(2);
        self.clk += CLK_3;
        self.read_write(bus, read, write);
    }

    fn abs_reg<B: Bus>(&mut self, bus: &mut B, indexed: u8, read: bool, write: bool) {
        let i = indexed as u16 + self.fetch(bus, self.pc) as u16;
        let hi = self.fetch(bus, self.pc.wrapping_add(1)) as u16;
        self.addr = (hi << 8).wrapping_add(i);
        if write {
            let dummy = self.addr.wrapping_sub(i & 0x100);
            self.fetch(bus, dummy);
            self.clk += CLK_4;
        } else {
            self.clk += CLK_3;
            if i & 0x100 != 0 {
                let dummy = self.addr.wrapping_sub(0x100);
                self.fetch(bus, dummy);
                self.clk += CLK_1;
            }
        }
        self.read_write(bus, read, write);
        self.pc = self.pc.wrapping_add(2);
    }

    fn ind_x<B: Bus>(&mut self, bus: &mut B, read: bool, write: bool) {
        let ptr = self.fetch(bus, self.pc).wrapping_add(self.x);
        self.pc = self.pc.wrapping_add(1);
        self.clk += CLK_5;
        let lo = self.ram[ptr as usize] as u16;
        let hi = self.ram[ptr.wrapping_add(1) as usize] as u16;
        self.addr = lo | hi << 8;
        self.read_write(bus, read, write);
    }

    fn ind_y<B: Bus>(&mut self, bus: &mut B, read: bool, write: bool) {
        let ptr = self.fetch(bus, self.pc);
        self.pc = self.pc.wrapping_add(1);
        let indexed = self.ram[ptr as usize] as u16 + self.y as u16;
        let hi = self.ram[ptr.wrapping_add(1) as usize] as u16;
        self.clk += CLK_4;
        self.addr = (hi << 8).wrapping_add(indexed);
        if write {
            self.clk += CLK_1;
            let dummy = self.addr.wrapping_sub(indexed & 0x100);
            self.fetch(bus, dummy);
        } else if indexed & 0x100 != 0 {
            let dummy = self.addr.wrapping_sub(0x100);
            self.fetch(bus, dummy);
            self.clk += CLK_1;
        }
        self.read_write(bus, read, write);
    }

    fn read_write<B: Bus>(&mut self, bus: &mut B, read: bool, write: bool) {
        if read {
            self.data = self.fetch(bus, self.addr);
            self.clk += CLK_1;
            if write {
                self.store(bus, self.addr, self.data);
                self.clk += CLK_1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{TestBus, booted, step};
    use crate::clock::CLK_1;

    fn cycles_of(program: &[u8], setup: impl FnOnce(&mut super::Cpu)) -> i64 {
        let mut bus = TestBus::with_program(0x8000, program);
        let mut cpu = booted(&mut bus);
        setup(&mut cpu);
        let start = cpu.current_clock();
        step(&mut cpu, &mut bus);
        (cpu.current_clock() - start) / CLK_1
    }

    #[test]
    fn test_abs_x_page_cross_penalty() {
        // LDA $80F0,X
        assert_eq!(cycles_of(&[0xbd, 0xf0, 0x80], |cpu| cpu.x = 0x0f), 4);
        assert_eq!(cycles_of(&[0xbd, 0xf0, 0x80], |cpu| cpu.x = 0x10), 5);
    }

    #[test]
    fn test_abs_x_store_always_pays_penalty() {
        // STA $80F0,X
        assert_eq!(cycles_of(&[0x9d, 0xf0, 0x80], |cpu| cpu.x = 0x01), 5);
    }

    #[test]
    fn test_ind_y_costs() {
        let setup = |cpu: &mut super::Cpu| {
            cpu.ram[0x10] = 0xf0;
            cpu.ram[0x11] = 0x80;
            cpu.y = 0x20;
        };
        // LDA ($10),Y crosses a page
        assert_eq!(cycles_of(&[0xb1, 0x10], setup), 6);
        // STA ($10),Y
        assert_eq!(cycles_of(&[0x91, 0x10], setup), 6);
    }

    #[test]
    fn test_read_modify_write_costs() {
        // INC $10 / INC $1234 / INC $1234,X
        assert_eq!(cycles_of(&[0xe6, 0x10], |_| {}), 5);
        assert_eq!(cycles_of(&[0xee, 0x34, 0x12], |_| {}), 6);
        assert_eq!(cycles_of(&[0xfe, 0x34, 0x12], |_| {}), 7);
    }

    #[test]
    fn test_zero_page_index_wraps() {
        let mut bus = TestBus::with_program(0x8000, &[0xb5, 0xf0]);
        let mut cpu = booted(&mut bus);
        cpu.x = 0x20;
        cpu.ram[0x10] = 0x77;
        step(&mut cpu, &mut bus);
        assert_eq!(cpu.get_a(), 0x77);
    }

    #[test]
    fn test_ind_x_pointer_wraps_in_zero_page() {
        let mut bus = TestBus::with_program(0x8000, &[0xa1, 0xfe]);
        bus.mem[0x9000] = 0x5a;
        let mut cpu = booted(&mut bus);
        cpu.x = 0x01;
        cpu.ram[0xff] = 0x00;
        cpu.ram[0x00] = 0x90;
        step(&mut cpu, &mut bus);
        assert_eq!(cpu.get_a(), 0x5a);
    }
}
