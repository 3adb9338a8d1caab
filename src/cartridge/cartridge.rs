use tracing::{info, warn};

use crate::cartridge::Mapper;
use crate::cartridge::mapper::create_mapper;
use crate::error::{Error, Result};

const HEADER_SIZE: usize = 16;
const TRAINER_SIZE: usize = 512;
const PRG_UNIT: usize = 16384;
const CHR_UNIT: usize = 8192;

/// Nametable layout wired on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirroringMode {
    /// $2000/$2400 share a table, $2800/$2C00 the other
    Horizontal,
    /// $2000/$2800 share a table, $2400/$2C00 the other
    Vertical,
    /// Extra VRAM on the board, four distinct tables
    FourScreen,
}

impl MirroringMode {
    /// Physical table used by each of the four logical nametables
    pub fn banks(self) -> [usize; 4] {
        match self {
            MirroringMode::Horizontal => [0, 0, 1, 1],
            MirroringMode::Vertical => [0, 1, 0, 1],
            MirroringMode::FourScreen => [0, 1, 2, 3],
        }
    }
}

/// An NES cartridge image, parsed down to its board
pub struct Cartridge {
    mapper: Box<dyn Mapper>,
}

impl Cartridge {
    /// Parse an iNES v1 image
    pub fn new(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE || &data[0..4] != b"NES\x1A" {
            return Err(Error::InvalidRom("missing iNES header"));
        }

        let prg_rom_size = data[4] as usize * PRG_UNIT;
        let chr_rom_size = data[5] as usize * CHR_UNIT;
        let flags6 = data[6];
        let flags7 = data[7];

        // lower nibble from flags 6, upper nibble from flags 7
        let mapper_number = (flags6 >> 4) | (flags7 & 0xF0);

        // four-screen wins over the mirroring bit
        let mirroring = if (flags6 & 0x08) != 0 {
            MirroringMode::FourScreen
        } else if (flags6 & 0x01) != 0 {
            MirroringMode::Vertical
        } else {
            MirroringMode::Horizontal
        };

        let has_trainer = (flags6 & 0x04) != 0;
        if has_trainer {
            warn!("ignoring 512-byte trainer");
        }
        let trainer_offset = if has_trainer { TRAINER_SIZE } else { 0 };

        if prg_rom_size == 0 {
            return Err(Error::InvalidRom("no PRG ROM"));
        }

        let prg_rom_start = HEADER_SIZE + trainer_offset;
        let prg_rom_end = prg_rom_start + prg_rom_size;
        let chr_rom_start = prg_rom_end;
        let chr_rom_end = chr_rom_start + chr_rom_size;

        if data.len() < chr_rom_end {
            return Err(Error::InvalidRom("file too small for its PRG/CHR sizes"));
        }

        let prg_rom = data[prg_rom_start..prg_rom_end].to_vec();
        let chr_rom = data[chr_rom_start..chr_rom_end].to_vec();

        info!(
            "cartridge: mapper {} prg {}K chr {}K {:?}",
            mapper_number,
            prg_rom_size / 1024,
            chr_rom_size / 1024,
            mirroring
        );

        let mapper = create_mapper(mapper_number, prg_rom, chr_rom, mirroring)?;

        Ok(Self { mapper })
    }

    pub fn mapper(&self) -> &dyn Mapper {
        &*self.mapper
    }

    pub fn mapper_mut(&mut self) -> &mut dyn Mapper {
        &mut *self.mapper
    }

    /// Give up the board so it can be plugged into the bus
    pub fn into_mapper(self) -> Box<dyn Mapper> {
        self.mapper
    }
}
