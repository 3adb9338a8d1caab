#![allow(dead_code)]

use nestep::Nes;

pub const PRG_SIZE: usize = 0x4000;
pub const CHR_SIZE: usize = 0x2000;

/// Builds an NROM iNES image in memory: one 16K PRG bank holding `program`
/// at $8000 and 8K of CHR.
pub struct RomBuilder {
    program: Vec<u8>,
    nmi: u16,
    chr: Vec<u8>,
    flags6: u8,
}

impl RomBuilder {
    pub fn new(program: &[u8]) -> Self {
        Self {
            program: program.to_vec(),
            nmi: 0x8000,
            chr: vec![0; CHR_SIZE],
            flags6: 0x01,
        }
    }

    pub fn nmi(mut self, addr: u16) -> Self {
        self.nmi = addr;
        self
    }

    /// Fill CHR ROM; `f` gets the byte address
    pub fn chr(mut self, f: impl Fn(usize) -> u8) -> Self {
        for (i, byte) in self.chr.iter_mut().enumerate() {
            *byte = f(i);
        }
        self
    }

    pub fn mapper(mut self, number: u8) -> Self {
        self.flags6 = (self.flags6 & 0x0f) | (number << 4);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut rom = b"NES\x1a".to_vec();
        rom.extend([1, 1, self.flags6, 0]);
        rom.resize(16, 0);

        let mut prg = vec![0xea; PRG_SIZE];
        prg[..self.program.len()].copy_from_slice(&self.program);
        prg[PRG_SIZE - 6..].copy_from_slice(&[
            self.nmi as u8,
            (self.nmi >> 8) as u8,
            0x00,
            0x80,
            0x00,
            0x80,
        ]);
        rom.extend(prg);
        rom.extend(&self.chr);
        rom
    }
}

/// Result of a ROM that reports through PRG RAM: $6001-$6003 hold the
/// DE B0 61 signature once $6000 is valid, and $6000 is 0x80 while running.
#[derive(Debug, PartialEq, Eq)]
pub enum RomResult {
    Pass,
    Fail(u8),
    Timeout,
}

pub fn run_until_result(nes: &mut Nes, max_frames: u32) -> RomResult {
    for _ in 0..max_frames {
        nes.step();
        let signature = [
            nes.read_memory(0x6001),
            nes.read_memory(0x6002),
            nes.read_memory(0x6003),
        ];
        if signature != [0xde, 0xb0, 0x61] {
            continue;
        }
        match nes.read_memory(0x6000) {
            0x00 => return RomResult::Pass,
            status if status < 0x80 => return RomResult::Fail(status),
            _ => {}
        }
    }
    RomResult::Timeout
}

/// Count pixels of one color in the last frame
pub fn count_pixels(nes: &Nes, color: u32) -> usize {
    nes.output_pixels().iter().filter(|&&p| p == color).count()
}
