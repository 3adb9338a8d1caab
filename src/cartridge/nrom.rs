use tracing::debug;

use crate::cartridge::Mapper;
use crate::cartridge::MirroringMode;
use crate::cpu::{Cpu, Peek, Poke};
use crate::ppu::Ppu;

const CHR_RAM_SIZE: usize = 8192;
const PRG_RAM_SIZE: usize = 8192;
const PRG_BANK_SIZE: usize = 0x4000;

/// NROM board (mapper 0).
///
/// No bank switching:
/// - 16KB or 32KB PRG ROM (16KB is mirrored at $C000)
/// - 8KB PRG-RAM at $6000-$7FFF
/// - 8KB CHR ROM, or CHR-RAM when the image carries none
/// - Fixed nametable mirroring
pub struct NROMMapper {
    prg_rom: Vec<u8>,
    prg_ram: Vec<u8>,
    chr_memory: Vec<u8>,
    mirroring: MirroringMode,
    has_chr_ram: bool,
}

impl NROMMapper {
    /// If `chr_rom` is empty, 8KB of CHR-RAM is allocated
    pub fn new(prg_rom: Vec<u8>, chr_rom: Vec<u8>, mirroring: MirroringMode) -> Self {
        let has_chr_ram = chr_rom.is_empty();
        let mut chr_memory = if has_chr_ram {
            vec![0; CHR_RAM_SIZE]
        } else {
            chr_rom
        };
        chr_memory.resize(CHR_RAM_SIZE, 0);

        Self {
            prg_rom,
            prg_ram: vec![0; PRG_RAM_SIZE],
            chr_memory,
            mirroring,
            has_chr_ram,
        }
    }

    pub fn has_chr_ram(&self) -> bool {
        self.has_chr_ram
    }
}

impl Mapper for NROMMapper {
    fn reset(&mut self, cpu: &mut Cpu, ppu: &mut Ppu) {
        cpu.add_mappings(0x6000..=0xffff, Peek::Cartridge, Poke::Cartridge);
        ppu.set_pattern_memory(self.chr_memory.clone(), self.has_chr_ram);
        ppu.set_mirroring(self.mirroring);
        debug!(
            "nrom reset: prg={}K chr_ram={} mirroring={:?}",
            self.prg_rom.len() / 1024,
            self.has_chr_ram,
            self.mirroring
        );
    }

    fn read_prg(&self, addr: u16) -> u8 {
        match addr {
            0x6000..=0x7fff => self.prg_ram[(addr - 0x6000) as usize],
            0x8000..=0xffff => {
                if self.prg_rom.is_empty() {
                    return (addr >> 8) as u8;
                }
                let offset = (addr - 0x8000) as usize;
                let size = if self.prg_rom.len() == PRG_BANK_SIZE {
                    PRG_BANK_SIZE
                } else {
                    self.prg_rom.len()
                };
                self.prg_rom[offset % size]
            }
            _ => (addr >> 8) as u8,
        }
    }

    fn write_prg(&mut self, addr: u16, value: u8) {
        // PRG ROM writes hit no register on this board
        if let 0x6000..=0x7fff = addr {
            self.prg_ram[(addr - 0x6000) as usize] = value;
        }
    }

    fn get_mirroring(&self) -> MirroringMode {
        self.mirroring
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_nrom_32kb_prg_rom_read() {
        let mut prg_rom = vec![0; 0x8000];
        prg_rom[0x0000] = 0xAA;
        prg_rom[0x4000] = 0xBB;
        prg_rom[0x7FFF] = 0xCC;

        let mapper = NROMMapper::new(prg_rom, vec![0; 8192], MirroringMode::Horizontal);

        assert_eq!(mapper.read_prg(0x8000), 0xAA);
        assert_eq!(mapper.read_prg(0xC000), 0xBB);
        assert_eq!(mapper.read_prg(0xFFFF), 0xCC);
    }

    #[test]
    fn test_nrom_16kb_prg_rom_mirroring() {
        let mut prg_rom = vec![0; 0x4000];
        prg_rom[0x0000] = 0xAA;
        prg_rom[0x3FFF] = 0xBB;

        let mapper = NROMMapper::new(prg_rom, vec![0; 8192], MirroringMode::Horizontal);

        assert_eq!(mapper.read_prg(0x8000), 0xAA);
        assert_eq!(mapper.read_prg(0xBFFF), 0xBB);
        // $C000-$FFFF mirrors the only bank
        assert_eq!(mapper.read_prg(0xC000), 0xAA);
        assert_eq!(mapper.read_prg(0xFFFF), 0xBB);
    }

    #[test]
    fn test_nrom_prg_ram_write_and_read() {
        let mut mapper = NROMMapper::new(vec![0; 0x8000], vec![], MirroringMode::Horizontal);
        mapper.write_prg(0x6000, 0x12);
        mapper.write_prg(0x7FFF, 0x34);
        assert_eq!(mapper.read_prg(0x6000), 0x12);
        assert_eq!(mapper.read_prg(0x7FFF), 0x34);
    }

    #[test]
    fn test_nrom_prg_write_ignored() {
        let prg_rom = vec![0xAA; 0x8000];
        let mut mapper = NROMMapper::new(prg_rom, vec![0; 8192], MirroringMode::Horizontal);

        mapper.write_prg(0x8000, 0xBB);

        assert_eq!(mapper.read_prg(0x8000), 0xAA);
    }

    #[test]
    fn test_nrom_reset_claims_cartridge_space() {
        let mut cpu = Cpu::new();
        let mut ppu = Ppu::new(&Config::default());
        let mut mapper = NROMMapper::new(vec![0; 0x4000], vec![0x55; 8192], MirroringMode::Vertical);
        mapper.reset(&mut cpu, &mut ppu);

        assert_eq!(cpu.peek_handler(0x5fff), Peek::OpenBus);
        assert_eq!(cpu.peek_handler(0x6000), Peek::Cartridge);
        assert_eq!(cpu.peek_handler(0xfffc), Peek::Cartridge);
        assert_eq!(cpu.poke_handler(0x8000), Poke::Cartridge);
        assert_eq!(ppu.pattern_memory()[0x1fff], 0x55);
        assert!(!ppu.pattern_memory_writable());
    }

    #[test]
    fn test_nrom_chr_ram_is_writable() {
        let mut cpu = Cpu::new();
        let mut ppu = Ppu::new(&Config::default());
        let mut mapper = NROMMapper::new(vec![0; 0x4000], vec![], MirroringMode::Horizontal);
        assert!(mapper.has_chr_ram());
        mapper.reset(&mut cpu, &mut ppu);
        assert_eq!(ppu.pattern_memory().len(), 8192);
        assert!(ppu.pattern_memory_writable());
    }

    #[test]
    fn test_nrom_mirroring_modes() {
        let mapper_h = NROMMapper::new(vec![0; 0x8000], vec![0; 8192], MirroringMode::Horizontal);
        assert_eq!(mapper_h.get_mirroring(), MirroringMode::Horizontal);

        let mapper_v = NROMMapper::new(vec![0; 0x8000], vec![0; 8192], MirroringMode::Vertical);
        assert_eq!(mapper_v.get_mirroring(), MirroringMode::Vertical);

        let mapper_4 = NROMMapper::new(vec![0; 0x8000], vec![0; 8192], MirroringMode::FourScreen);
        assert_eq!(mapper_4.get_mirroring(), MirroringMode::FourScreen);
    }
}
