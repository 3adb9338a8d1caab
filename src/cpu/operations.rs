//! Instruction semantics.
//!
//! Operand instructions work on `data` (and `addr` for the unstable stores).
//! Implied instructions charge their own cycles.

use crate::clock::{CLK_2, CLK_3, CLK_4, CLK_5, CLK_6, CLK_7, FOREVER_CLOCK};

use super::decoder::Op;
use super::{Bus, Cpu, IRQ_VECTOR, Irq};

impl Cpu {
    pub(super) fn operate<B: Bus>(&mut self, bus: &mut B, op: Op) {
        match op {
            // loads
            Op::Lda => {
                self.a = self.data;
                self.p_nz = self.a as u16;
            }
            Op::Ldx => {
                self.x = self.data;
                self.p_nz = self.x as u16;
            }
            Op::Ldy => {
                self.y = self.data;
                self.p_nz = self.y as u16;
            }

            // stores
            Op::Sta => self.data = self.a,
            Op::Stx => self.data = self.x,
            Op::Sty => self.data = self.y,

            // transfers
            Op::Tax => {
                self.clk += CLK_2;
                self.x = self.a;
                self.p_nz = self.x as u16;
            }
            Op::Tay => {
                self.clk += CLK_2;
                self.y = self.a;
                self.p_nz = self.y as u16;
            }
            Op::Txa => {
                self.clk += CLK_2;
                self.a = self.x;
                self.p_nz = self.a as u16;
            }
            Op::Tya => {
                self.clk += CLK_2;
                self.a = self.y;
                self.p_nz = self.a as u16;
            }

            // flow control
            Op::JmpAbs => {
                self.pc = self.peek16(bus, self.pc);
                self.clk += CLK_3;
            }
            Op::JmpInd => {
                let pos = self.peek16(bus, self.pc);
                let lo = self.fetch(bus, pos) as u16;
                // the high byte never carries into the next page
                let pos = (pos & 0xff00) | (pos.wrapping_add(1) & 0x00ff);
                let hi = self.fetch(bus, pos) as u16;
                self.pc = hi << 8 | lo;
                self.clk += CLK_5;
            }
            Op::Jsr => {
                self.push16(self.pc.wrapping_add(1));
                self.pc = self.peek16(bus, self.pc);
                self.clk += CLK_6;
            }
            Op::Rts => {
                self.pc = self.pull16().wrapping_add(1);
                self.clk += CLK_6;
            }
            Op::Rti => {
                self.clk += CLK_6;
                let packed = self.pull8();
                self.pc = self.pull16();
                self.flags_unpack(packed);
                if self.irq_flags.is_empty() || self.p_i != 0 {
                    self.clk_irq = FOREVER_CLOCK;
                } else {
                    self.clk_target = 0;
                    self.clk_irq = 0;
                }
            }
            Op::Bne => self.branch(bus, self.p_nz & 0xff != 0),
            Op::Beq => self.branch(bus, self.p_nz & 0xff == 0),
            Op::Bmi => self.branch(bus, self.p_nz & 0x180 != 0),
            Op::Bpl => self.branch(bus, self.p_nz & 0x180 == 0),
            Op::Bcs => self.branch(bus, self.p_c != 0),
            Op::Bcc => self.branch(bus, self.p_c == 0),
            Op::Bvs => self.branch(bus, self.p_v != 0),
            Op::Bvc => self.branch(bus, self.p_v == 0),

            // arithmetic
            Op::Adc => self.adc(),
            Op::Sbc => self.sbc(),

            // logic
            Op::And => {
                self.a &= self.data;
                self.p_nz = self.a as u16;
            }
            Op::Ora => {
                self.a |= self.data;
                self.p_nz = self.a as u16;
            }
            Op::Eor => {
                self.a ^= self.data;
                self.p_nz = self.a as u16;
            }
            Op::Bit => {
                let data = self.data as u16;
                self.p_nz = u16::from(data & self.a as u16 != 0) | ((data & 0x80) << 1);
                self.p_v = self.data & 0x40;
            }
            Op::Cmp => self.compare(self.a),
            Op::Cpx => self.compare(self.x),
            Op::Cpy => self.compare(self.y),

            // shifts
            Op::Asl => {
                self.p_c = self.data >> 7;
                self.data <<= 1;
                self.p_nz = self.data as u16;
            }
            Op::Lsr => {
                self.p_c = self.data & 1;
                self.data >>= 1;
                self.p_nz = self.data as u16;
            }
            Op::Rol => {
                let result = self.data << 1 | self.p_c;
                self.p_c = self.data >> 7;
                self.data = result;
                self.p_nz = result as u16;
            }
            Op::Ror => {
                let result = self.data >> 1 | self.p_c << 7;
                self.p_c = self.data & 1;
                self.data = result;
                self.p_nz = result as u16;
            }

            // increments and decrements
            Op::Dec => {
                self.data = self.data.wrapping_sub(1);
                self.p_nz = self.data as u16;
            }
            Op::Inc => {
                self.data = self.data.wrapping_add(1);
                self.p_nz = self.data as u16;
            }
            Op::Dex => {
                self.clk += CLK_2;
                self.x = self.x.wrapping_sub(1);
                self.data = self.x;
                self.p_nz = self.x as u16;
            }
            Op::Dey => {
                self.clk += CLK_2;
                self.y = self.y.wrapping_sub(1);
                self.data = self.y;
                self.p_nz = self.y as u16;
            }
            Op::Inx => {
                self.clk += CLK_2;
                self.x = self.x.wrapping_add(1);
                self.data = self.x;
                self.p_nz = self.x as u16;
            }
            Op::Iny => {
                self.clk += CLK_2;
                self.y = self.y.wrapping_add(1);
                self.data = self.y;
                self.p_nz = self.y as u16;
            }

            // flags
            Op::Clc => {
                self.clk += CLK_2;
                self.p_c = 0;
            }
            Op::Sec => {
                self.clk += CLK_2;
                self.p_c = 1;
            }
            Op::Cld => {
                self.clk += CLK_2;
                self.p_d = 0;
            }
            Op::Sed => {
                self.clk += CLK_2;
                self.p_d = 0x08;
            }
            Op::Clv => {
                self.clk += CLK_2;
                self.p_v = 0;
            }
            Op::Sei => {
                self.clk += CLK_2;
                if self.p_i == 0 {
                    self.p_i = 0x04;
                    self.clk_irq = FOREVER_CLOCK;
                    // an IRQ already pending still gets in
                    if !self.irq_flags.is_empty() {
                        self.do_isr(bus, IRQ_VECTOR);
                    }
                }
            }
            Op::Cli => {
                self.clk += CLK_2;
                if self.p_i != 0 {
                    self.p_i = 0;
                    if !self.irq_flags.is_empty() {
                        self.schedule_delayed_irq();
                    }
                }
            }

            // stack
            Op::Pha => {
                self.clk += CLK_3;
                self.push8(self.a);
            }
            Op::Php => {
                self.clk += CLK_3;
                let data = self.flags_pack() | 0x10;
                self.push8(data);
            }
            Op::Pla => {
                self.clk += CLK_4;
                self.a = self.pull8();
                self.p_nz = self.a as u16;
            }
            Op::Plp => {
                self.clk += CLK_4;
                let i = self.p_i;
                let packed = self.pull8();
                self.flags_unpack(packed);
                if !self.irq_flags.is_empty() {
                    if i > self.p_i {
                        self.schedule_delayed_irq();
                    } else if i < self.p_i {
                        self.clk_irq = FOREVER_CLOCK;
                        self.do_isr(bus, IRQ_VECTOR);
                    }
                }
            }
            Op::Tsx => {
                self.clk += CLK_2;
                self.x = self.sp;
                self.p_nz = self.x as u16;
            }
            Op::Txs => {
                self.clk += CLK_2;
                self.sp = self.x;
            }

            // undocumented
            Op::Anc => {
                self.a &= self.data;
                self.p_nz = self.a as u16;
                self.p_c = self.a >> 7;
            }
            Op::Ane => {
                self.a = (self.a | 0xee) & self.x & self.data;
                self.p_nz = self.a as u16;
            }
            Op::Arr => {
                self.a = ((self.data & self.a) >> 1) | (self.p_c << 7);
                self.p_nz = self.a as u16;
                self.p_c = (self.a >> 6) & 1;
                self.p_v = ((self.a >> 6) ^ (self.a >> 5)) & 1;
            }
            Op::Asr => {
                self.p_c = self.data & self.a & 0x1;
                self.a = (self.data & self.a) >> 1;
                self.p_nz = self.a as u16;
            }
            Op::Dcp => {
                self.data = self.data.wrapping_sub(1);
                self.compare(self.a);
            }
            Op::Isb => {
                self.data = self.data.wrapping_add(1);
                self.sbc();
            }
            Op::Las => {
                self.sp &= self.data;
                self.a = self.sp;
                self.x = self.sp;
                self.p_nz = self.sp as u16;
            }
            Op::Lax | Op::Lxa => {
                self.a = self.data;
                self.x = self.data;
                self.p_nz = self.data as u16;
            }
            Op::Rla => {
                let c = self.p_c;
                self.p_c = self.data >> 7;
                self.data = self.data << 1 | c;
                self.a &= self.data;
                self.p_nz = self.a as u16;
            }
            Op::Rra => {
                let c = self.p_c << 7;
                self.p_c = self.data & 1;
                self.data = self.data >> 1 | c;
                self.adc();
            }
            Op::Sax => self.data = self.a & self.x,
            Op::Sbx => {
                let result = (self.a & self.x) as i16 - self.data as i16;
                self.p_c = u8::from(result >= 0);
                self.x = result as u8;
                self.p_nz = self.x as u16;
            }
            Op::Sha => self.data = self.a & self.x & self.high_byte_plus_one(),
            Op::Shs => {
                self.sp = self.a & self.x;
                self.data = self.sp & self.high_byte_plus_one();
            }
            Op::Shx => {
                self.data = self.x & self.high_byte_plus_one();
                self.addr = (self.data as u16) << 8 | (self.addr & 0xff);
            }
            Op::Shy => {
                self.data = self.y & self.high_byte_plus_one();
                self.addr = (self.data as u16) << 8 | (self.addr & 0xff);
            }
            Op::Slo => {
                self.p_c = self.data >> 7;
                self.data <<= 1;
                self.a |= self.data;
                self.p_nz = self.a as u16;
            }
            Op::Sre => {
                self.p_c = self.data & 1;
                self.data >>= 1;
                self.a ^= self.data;
                self.p_nz = self.a as u16;
            }

            Op::Nop => {}

            // interrupts
            Op::Brk => {
                self.push16(self.pc.wrapping_add(1));
                let data = self.flags_pack() | 0x10;
                self.push8(data);
                self.p_i = 0x04;
                self.clk_irq = FOREVER_CLOCK;
                self.clk += CLK_7;
                let addr = self.fetch_irq_isr_vector(bus);
                self.pc = self.peek16(bus, addr);
            }
            Op::Jam => {
                self.pc = self.pc.wrapping_sub(1);
                self.clk += CLK_2;
                if !self.jammed {
                    self.jammed = true;
                    self.clk_nmi = FOREVER_CLOCK;
                    self.clk_irq = FOREVER_CLOCK;
                    self.irq_flags = Irq::empty();
                }
            }
        }
    }

    /// Take a pending IRQ after exactly one more instruction
    fn schedule_delayed_irq(&mut self) {
        let clk = self.clk + 1;
        self.clk_irq = clk;
        if self.clk_target > clk {
            self.clk_target = clk;
        }
    }

    fn high_byte_plus_one(&self) -> u8 {
        ((self.addr >> 8) as u8).wrapping_add(1)
    }

    fn branch<B: Bus>(&mut self, bus: &mut B, cond: bool) {
        if cond {
            let next = self.pc.wrapping_add(1);
            let rel = self.fetch(bus, self.pc) as i8;
            self.pc = next.wrapping_add(rel as u16);
            self.clk += if (next ^ self.pc) & 0x100 == 0 {
                CLK_3
            } else {
                CLK_4
            };
        } else {
            self.pc = self.pc.wrapping_add(1);
            self.clk += CLK_2;
        }
    }

    fn adc(&mut self) {
        let tmp = self.a as u16 + self.data as u16 + self.p_c as u16;
        self.p_v = !(self.a ^ self.data) & (self.a ^ tmp as u8) & 0x80;
        self.a = tmp as u8;
        self.p_nz = self.a as u16;
        self.p_c = (tmp >> 8) as u8 & 1;
    }

    fn sbc(&mut self) {
        let data = self.data ^ 0xff;
        let tmp = self.a as u16 + data as u16 + self.p_c as u16;
        self.p_v = !(self.a ^ data) & (self.a ^ tmp as u8) & 0x80;
        self.a = tmp as u8;
        self.p_nz = self.a as u16;
        self.p_c = (tmp >> 8) as u8 & 1;
    }

    fn compare(&mut self, reg: u8) {
        let result = reg as i16 - self.data as i16;
        self.p_nz = (result & 0xff) as u16;
        self.p_c = u8::from(result >= 0);
    }
}
