use crate::cartridge::{MirroringMode, NROMMapper};
use crate::cpu::Cpu;
use crate::error::{Error, Result};
use crate::ppu::Ppu;

/// Cartridge board wired to the CPU and PPU buses.
///
/// The board claims CPU addresses $6000-$FFFF when it is reset. Reads and
/// writes that land there come back through `read_prg`/`write_prg`. Pattern
/// memory and the nametable layout are handed to the PPU at reset, so the
/// PPU fetches tiles without calling back into the board.
pub trait Mapper {
    /// Install CPU mappings and hand pattern memory and mirroring to the PPU
    fn reset(&mut self, cpu: &mut Cpu, ppu: &mut Ppu);

    /// Read a byte from PRG space (CPU $6000-$FFFF)
    fn read_prg(&self, addr: u16) -> u8;

    /// Write a byte to PRG space (CPU $6000-$FFFF)
    /// - $6000-$7FFF: PRG-RAM
    /// - $8000-$FFFF: mapper registers, if the board has any
    fn write_prg(&mut self, addr: u16, value: u8);

    /// Nametable mirroring wired on the board
    fn get_mirroring(&self) -> MirroringMode;

    /// Called once per frame after the CPU clock has been rebased
    fn vsync(&mut self) {}
}

/// Build the board for an iNES mapper number
pub fn create_mapper(
    mapper_number: u8,
    prg_rom: Vec<u8>,
    chr_rom: Vec<u8>,
    mirroring: MirroringMode,
) -> Result<Box<dyn Mapper>> {
    match mapper_number {
        0 => Ok(Box::new(NROMMapper::new(prg_rom, chr_rom, mirroring))),
        n => Err(Error::UnsupportedMapper(n)),
    }
}
