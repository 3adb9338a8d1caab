//! Opcode decoding.
//!
//! Every opcode maps to an [`Instruction`]: an access kind, an operation and,
//! for memory operands, an addressing mode. The table is built at compile time.

use crate::clock::Clock;

/// Addressing modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Imm,
    Zpg,
    ZpgX,
    ZpgY,
    Abs,
    AbsX,
    AbsY,
    IndX,
    IndY,
}

impl Mode {
    /// Zero-page modes write their result straight into RAM
    pub fn is_zero_page(self) -> bool {
        matches!(self, Mode::Zpg | Mode::ZpgX | Mode::ZpgY)
    }
}

/// Operations, official and undocumented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Lda,
    Ldx,
    Ldy,
    Sta,
    Stx,
    Sty,
    Tax,
    Tay,
    Txa,
    Tya,
    JmpAbs,
    JmpInd,
    Jsr,
    Rts,
    Rti,
    Bne,
    Beq,
    Bmi,
    Bpl,
    Bcs,
    Bcc,
    Bvs,
    Bvc,
    Adc,
    Sbc,
    And,
    Ora,
    Eor,
    Bit,
    Cmp,
    Cpx,
    Cpy,
    Asl,
    Lsr,
    Rol,
    Ror,
    Dec,
    Inc,
    Dex,
    Dey,
    Inx,
    Iny,
    Clc,
    Sec,
    Cld,
    Sed,
    Cli,
    Sei,
    Clv,
    Pha,
    Php,
    Pla,
    Plp,
    Tsx,
    Txs,
    Anc,
    Ane,
    Arr,
    Asr,
    Dcp,
    Isb,
    Las,
    Lax,
    Lxa,
    Rla,
    Rra,
    Sax,
    Sbx,
    Sha,
    Shs,
    Shx,
    Shy,
    Slo,
    Sre,
    Nop,
    Brk,
    Jam,
}

/// How an instruction touches its operand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// Operand is read, result stays in registers
    Read(Op, Mode),
    /// Operand address is computed, result is stored back
    Write(Op, Mode),
    /// Read-modify-write
    ReadWrite(Op, Mode),
    /// Operates on the accumulator (ASL A, ...)
    Accumulator(Op),
    /// No memory operand, the operation handles its own timing
    Implied(Op),
    /// Skips `operands` bytes and burns `cycles` CPU cycles
    Skip { operands: u16, cycles: Clock },
}

use Mode::*;

// The 8 slots are indexed by bits 2-4 of the opcode. Slots a group never
// uses hold Imm.
const CTL: [Mode; 8] = [Imm, Zpg, Imm, Abs, Imm, ZpgX, Imm, AbsX];
const RMW: [Mode; 8] = [Imm, Zpg, Imm, Abs, Imm, ZpgY, Imm, AbsY];
const ALU: [Mode; 8] = [IndX, Zpg, Imm, Abs, IndY, ZpgX, AbsY, AbsX];
const UNO: [Mode; 8] = [IndX, Zpg, Imm, Abs, IndY, ZpgY, AbsY, AbsY];

const fn slot(opcode: u8) -> usize {
    ((opcode >> 2) & 7) as usize
}

const fn ctl(opcode: u8) -> Mode {
    CTL[slot(opcode)]
}

const fn rmw(opcode: u8) -> Mode {
    RMW[slot(opcode)]
}

const fn alu(opcode: u8) -> Mode {
    ALU[slot(opcode)]
}

const fn uno(opcode: u8) -> Mode {
    UNO[slot(opcode)]
}

/// Decode a single opcode
pub const fn decode(opcode: u8) -> Instruction {
    use Instruction::*;
    use Op::*;
    let o = opcode;
    match o {
        // loads
        0xa9 | 0xa5 | 0xb5 | 0xad | 0xbd | 0xb9 | 0xa1 | 0xb1 => Read(Lda, alu(o)),
        0xa2 | 0xa6 | 0xb6 | 0xae | 0xbe => Read(Ldx, rmw(o)),
        0xa0 | 0xa4 | 0xb4 | 0xac | 0xbc => Read(Ldy, ctl(o)),

        // stores
        0x85 | 0x95 | 0x8d | 0x9d | 0x99 | 0x81 | 0x91 => Write(Sta, alu(o)),
        0x86 | 0x96 | 0x8e => Write(Stx, rmw(o)),
        0x84 | 0x94 | 0x8c => Write(Sty, ctl(o)),

        // transfers
        0xaa => Implied(Tax),
        0xa8 => Implied(Tay),
        0x8a => Implied(Txa),
        0x98 => Implied(Tya),

        // flow control
        0x4c => Implied(JmpAbs),
        0x6c => Implied(JmpInd),
        0x20 => Implied(Jsr),
        0x60 => Implied(Rts),
        0x40 => Implied(Rti),
        0xd0 => Implied(Bne),
        0xf0 => Implied(Beq),
        0x30 => Implied(Bmi),
        0x10 => Implied(Bpl),
        0xb0 => Implied(Bcs),
        0x90 => Implied(Bcc),
        0x70 => Implied(Bvs),
        0x50 => Implied(Bvc),

        // arithmetic
        0x69 | 0x65 | 0x75 | 0x6d | 0x7d | 0x79 | 0x61 | 0x71 => Read(Adc, alu(o)),
        0xe9 | 0xeb | 0xe5 | 0xf5 | 0xed | 0xfd | 0xf9 | 0xe1 | 0xf1 => Read(Sbc, alu(o)),

        // logic
        0x29 | 0x25 | 0x35 | 0x2d | 0x3d | 0x39 | 0x21 | 0x31 => Read(And, alu(o)),
        0x09 | 0x05 | 0x15 | 0x0d | 0x1d | 0x19 | 0x01 | 0x11 => Read(Ora, alu(o)),
        0x49 | 0x45 | 0x55 | 0x4d | 0x5d | 0x59 | 0x41 | 0x51 => Read(Eor, alu(o)),
        0x24 | 0x2c => Read(Bit, alu(o)),
        0xc9 | 0xc5 | 0xd5 | 0xcd | 0xdd | 0xd9 | 0xc1 | 0xd1 => Read(Cmp, alu(o)),
        0xe0 | 0xe4 | 0xec => Read(Cpx, rmw(o)),
        0xc0 | 0xc4 | 0xcc => Read(Cpy, rmw(o)),

        // shifts
        0x0a => Accumulator(Asl),
        0x06 | 0x16 | 0x0e | 0x1e => ReadWrite(Asl, alu(o)),
        0x4a => Accumulator(Lsr),
        0x46 | 0x56 | 0x4e | 0x5e => ReadWrite(Lsr, alu(o)),
        0x2a => Accumulator(Rol),
        0x26 | 0x36 | 0x2e | 0x3e => ReadWrite(Rol, alu(o)),
        0x6a => Accumulator(Ror),
        0x66 | 0x76 | 0x6e | 0x7e => ReadWrite(Ror, alu(o)),

        // increments and decrements
        0xc6 | 0xd6 | 0xce | 0xde => ReadWrite(Dec, alu(o)),
        0xe6 | 0xf6 | 0xee | 0xfe => ReadWrite(Inc, alu(o)),
        0xca => Implied(Dex),
        0x88 => Implied(Dey),
        0xe8 => Implied(Inx),
        0xc8 => Implied(Iny),

        // flags
        0x18 => Implied(Clc),
        0x38 => Implied(Sec),
        0xd8 => Implied(Cld),
        0xf8 => Implied(Sed),
        0x58 => Implied(Cli),
        0x78 => Implied(Sei),
        0xb8 => Implied(Clv),

        // stack
        0x48 => Implied(Pha),
        0x08 => Implied(Php),
        0x68 => Implied(Pla),
        0x28 => Implied(Plp),
        0xba => Implied(Tsx),
        0x9a => Implied(Txs),

        // undocumented
        0x0b | 0x2b => Read(Anc, uno(o)),
        0x8b => Read(Ane, uno(o)),
        0x6b => Read(Arr, uno(o)),
        0x4b => Read(Asr, uno(o)),
        0xc7 | 0xd7 | 0xc3 | 0xd3 | 0xcf | 0xdf | 0xdb => ReadWrite(Dcp, alu(o)),
        0xe7 | 0xf7 | 0xef | 0xff | 0xfb | 0xe3 | 0xf3 => ReadWrite(Isb, alu(o)),
        0xbb => Read(Las, uno(o)),
        0xa7 | 0xb7 | 0xaf | 0xbf | 0xa3 | 0xb3 => Read(Lax, uno(o)),
        0xab => Read(Lxa, uno(o)),
        0x27 | 0x37 | 0x2f | 0x3f | 0x3b | 0x23 | 0x33 => ReadWrite(Rla, alu(o)),
        0x67 | 0x77 | 0x6f | 0x7f | 0x7b | 0x63 | 0x73 => ReadWrite(Rra, alu(o)),
        0x87 | 0x97 | 0x8f | 0x83 => Write(Sax, uno(o)),
        0xcb => Read(Sbx, uno(o)),
        0x9f | 0x93 => Write(Sha, uno(o)),
        0x9b => Write(Shs, uno(o)),
        0x9e => Write(Shx, rmw(o)),
        0x9c => Write(Shy, ctl(o)),
        0x07 | 0x17 | 0x0f | 0x1f | 0x1b | 0x03 | 0x13 => ReadWrite(Slo, alu(o)),
        0x47 | 0x57 | 0x4f | 0x5f | 0x5b | 0x43 | 0x53 => ReadWrite(Sre, alu(o)),

        // nops
        0x1a | 0x3a | 0x5a | 0x7a | 0xda | 0xea | 0xfa => Skip { operands: 0, cycles: 2 },
        0x80 | 0x82 | 0x89 | 0xc2 | 0xe2 => Skip { operands: 1, cycles: 2 },
        0x04 | 0x44 | 0x64 => Skip { operands: 1, cycles: 3 },
        0x14 | 0x34 | 0x54 | 0x74 | 0xd4 | 0xf4 => Skip { operands: 1, cycles: 4 },
        0x0c => Skip { operands: 2, cycles: 4 },
        0x1c | 0x3c | 0x5c | 0x7c | 0xdc | 0xfc => Read(Nop, ctl(o)),

        // interrupts
        0x00 => Implied(Brk),
        0x02 | 0x12 | 0x22 | 0x32 | 0x42 | 0x52 | 0x62 | 0x72 | 0x92 | 0xb2 | 0xd2 | 0xf2 => {
            Implied(Jam)
        }
    }
}

const fn build_table() -> [Instruction; 256] {
    let mut table = [Instruction::Implied(Op::Jam); 256];
    let mut i = 0;
    while i < 256 {
        table[i] = decode(i as u8);
        i += 1;
    }
    table
}

/// Dispatch table indexed by opcode
pub static DISPATCH: [Instruction; 256] = build_table();
