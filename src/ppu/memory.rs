use crate::cartridge::MirroringMode;
use crate::palette::PALETTE;

const NAMETABLE_SIZE: usize = 0x400;

/// Palette RAM contents at power-on
const PALETTE_RAM_BOOT: [u8; 32] = [
    0x3f, 0x01, 0x00, 0x01, 0x00, 0x02, 0x02, 0x0d, 0x08, 0x10, 0x08, 0x24, 0x00, 0x00, 0x04, 0x2c,
    0x09, 0x01, 0x34, 0x03, 0x00, 0x04, 0x00, 0x14, 0x08, 0x3a, 0x00, 0x02, 0x00, 0x20, 0x2c, 0x08,
];

/// Manages PPU memory: pattern tables, nametables and palette RAM
pub struct Memory {
    /// Pattern tables (CHR ROM/RAM), 8KB
    chr: Vec<u8>,
    /// Whether the board wired RAM for the pattern tables
    chr_writable: bool,
    /// Four physical nametables; only the first two exist without four-screen VRAM
    nametables: [[u8; NAMETABLE_SIZE]; 4],
    /// Physical table behind each of $2000, $2400, $2800, $2C00
    banks: [usize; 4],
    /// Palette RAM, 32 bytes as written
    palette_ram: [u8; 32],
    /// Palette RAM resolved to output colors
    output_color: [u32; 32],
    /// 0x3f, or 0x30 in greyscale mode
    coloring: u8,
    /// PPUMASK emphasis bits in palette index position
    emphasis: u16,
}

impl Memory {
    pub fn new() -> Self {
        let mut memory = Self {
            chr: vec![0; 0x2000],
            chr_writable: false,
            nametables: [[0xff; NAMETABLE_SIZE]; 4],
            banks: MirroringMode::Vertical.banks(),
            palette_ram: PALETTE_RAM_BOOT,
            output_color: [PALETTE[0]; 32],
            coloring: 0x3f,
            emphasis: 0,
        };
        memory.reset();
        memory
    }

    /// Reset palette state; pattern tables and nametables keep their contents
    pub fn reset(&mut self) {
        self.palette_ram = PALETTE_RAM_BOOT;
        self.coloring = 0x3f;
        self.emphasis = 0;
        self.update_output_color();
    }

    pub fn set_pattern_memory(&mut self, chr: Vec<u8>, writable: bool) {
        self.chr = chr;
        self.chr.resize(0x2000, 0);
        self.chr_writable = writable;
    }

    pub fn pattern_memory(&self) -> &[u8] {
        &self.chr
    }

    pub fn pattern_memory_writable(&self) -> bool {
        self.chr_writable
    }

    pub fn set_mirroring(&mut self, mirroring: MirroringMode) {
        self.banks = mirroring.banks();
    }

    /// Read from the pattern tables
    pub fn read_chr(&self, addr: u16) -> u8 {
        self.chr[(addr & 0x1fff) as usize]
    }

    /// Write to the pattern tables, if they are RAM
    pub fn write_chr(&mut self, addr: u16, value: u8) {
        if self.chr_writable {
            self.chr[(addr & 0x1fff) as usize] = value;
        }
    }

    /// Read from the nametable selected by bits 10-11 of `addr`
    pub fn read_nametable(&self, addr: u16) -> u8 {
        let bank = self.banks[(addr >> 10 & 3) as usize];
        self.nametables[bank][(addr & 0x3ff) as usize]
    }

    pub fn write_nametable(&mut self, addr: u16, value: u8) {
        let bank = self.banks[(addr >> 10 & 3) as usize];
        self.nametables[bank][(addr & 0x3ff) as usize] = value;
    }

    /// Pattern address of the tile the scroll address points at:
    /// tile index, fine Y and the background pattern table
    pub fn name_pattern(&self, scroll_addr: u16, pattern_base: u16) -> u16 {
        (self.read_nametable(scroll_addr) as u16) << 4 | (scroll_addr >> 12 & 7) | pattern_base
    }

    /// Attribute table address covering the scroll address, and the tile's
    /// palette already shifted into pixel position (0, 4, 8 or 12)
    pub fn attribute(&self, scroll_addr: u16) -> (u16, u8) {
        let io_addr = 0x23c0
            | (scroll_addr & 0x0c00)
            | (scroll_addr >> 4 & 0x0038)
            | (scroll_addr >> 2 & 0x0007);
        (io_addr, self.attribute_at(io_addr, scroll_addr))
    }

    /// Palette bits for the tile at `scroll_addr`, read from `io_addr`
    pub fn attribute_at(&self, io_addr: u16, scroll_addr: u16) -> u8 {
        let shift = (scroll_addr & 2) | (scroll_addr >> 4 & 4);
        (self.read_nametable(io_addr) >> shift & 3) << 2
    }

    /// Palette RAM read as seen through PPUDATA
    pub fn read_palette(&self, addr: u16) -> u8 {
        self.palette_ram[(addr & 0x1f) as usize] & self.coloring
    }

    /// Palette RAM write; entry 0 of each palette is shared between
    /// background and sprites
    pub fn write_palette(&mut self, addr: u16, value: u8) {
        let addr = (addr & 0x1f) as usize;
        let color = PALETTE[(value & self.coloring) as usize | self.emphasis as usize];
        self.palette_ram[addr] = value;
        self.output_color[addr] = color;
        if addr & 3 == 0 {
            self.palette_ram[addr ^ 0x10] = value;
            self.output_color[addr ^ 0x10] = color;
        }
    }

    /// Apply PPUMASK greyscale and emphasis
    pub fn set_coloring(&mut self, coloring: u8, emphasis: u16) {
        if self.coloring != coloring || self.emphasis != emphasis {
            self.coloring = coloring;
            self.emphasis = emphasis;
            self.update_output_color();
        }
    }

    fn update_output_color(&mut self) {
        for (out, &entry) in self.output_color.iter_mut().zip(&self.palette_ram) {
            *out = PALETTE[(entry & self.coloring) as usize | self.emphasis as usize];
        }
    }

    /// Output color of a palette RAM index
    pub fn color(&self, pixel: u8) -> u32 {
        self.output_color[(pixel & 0x1f) as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horizontal_mirroring() {
        let mut memory = Memory::new();
        memory.set_mirroring(MirroringMode::Horizontal);
        memory.write_nametable(0x2005, 0x11);
        memory.write_nametable(0x2805, 0x22);
        assert_eq!(memory.read_nametable(0x2405), 0x11);
        assert_eq!(memory.read_nametable(0x2c05), 0x22);
    }

    #[test]
    fn test_vertical_mirroring() {
        let mut memory = Memory::new();
        memory.set_mirroring(MirroringMode::Vertical);
        memory.write_nametable(0x2005, 0x11);
        memory.write_nametable(0x2405, 0x22);
        assert_eq!(memory.read_nametable(0x2805), 0x11);
        assert_eq!(memory.read_nametable(0x2c05), 0x22);
    }

    #[test]
    fn test_four_screen_keeps_tables_apart() {
        let mut memory = Memory::new();
        memory.set_mirroring(MirroringMode::FourScreen);
        for (i, base) in [0x2000u16, 0x2400, 0x2800, 0x2c00].into_iter().enumerate() {
            memory.write_nametable(base, i as u8);
        }
        for (i, base) in [0x2000u16, 0x2400, 0x2800, 0x2c00].into_iter().enumerate() {
            assert_eq!(memory.read_nametable(base), i as u8);
        }
    }

    #[test]
    fn test_chr_rom_is_read_only() {
        let mut memory = Memory::new();
        memory.set_pattern_memory(vec![0x55; 0x2000], false);
        memory.write_chr(0x0010, 0xaa);
        assert_eq!(memory.read_chr(0x0010), 0x55);

        memory.set_pattern_memory(vec![0; 0x2000], true);
        memory.write_chr(0x0010, 0xaa);
        assert_eq!(memory.read_chr(0x0010), 0xaa);
    }

    #[test]
    fn test_palette_backdrop_is_shared() {
        let mut memory = Memory::new();
        memory.write_palette(0x3f10, 0x21);
        assert_eq!(memory.read_palette(0x3f00), 0x21);
        assert_eq!(memory.color(0), PALETTE[0x21]);

        memory.write_palette(0x3f11, 0x05);
        assert_eq!(memory.read_palette(0x3f01), 0x01);
    }

    #[test]
    fn test_greyscale_masks_reads() {
        let mut memory = Memory::new();
        memory.write_palette(0x3f01, 0x2a);
        memory.set_coloring(0x30, 0);
        assert_eq!(memory.read_palette(0x3f01), 0x20);
        assert_eq!(memory.color(1), PALETTE[0x20]);
    }

    #[test]
    fn test_attribute_quadrants() {
        let mut memory = Memory::new();
        // bottom-right quadrant = 3, top-left = 1
        memory.write_nametable(0x23c0, 0b1100_0001);
        assert_eq!(memory.attribute(0x0000), (0x23c0, 0x4));
        // coarse X 2, coarse Y 2
        assert_eq!(memory.attribute(0x0042), (0x23c0, 0xc));
    }

    #[test]
    fn test_name_pattern_adds_fine_y_and_base() {
        let mut memory = Memory::new();
        memory.write_nametable(0x2001, 0x42);
        assert_eq!(memory.name_pattern(0x3001, 0x1000), 0x1423);
    }
}
