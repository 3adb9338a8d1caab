/// OAM attribute byte mask - bits 2-4 are unimplemented and always read as 0
pub const OAM_ATTRIBUTE_MASK: u8 = 0xE3;

/// Bit pair in the interleaved pattern holding each pixel, left to right
const PIXEL_POSITIONS: [[u32; 8]; 2] = [
    [3, 7, 2, 6, 1, 5, 0, 4], // normal
    [4, 0, 5, 1, 6, 2, 7, 3], // flipped horizontally
];

const MAP_SIZE: usize = 264;

/// One opaque sprite pixel on the next line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpritePixel {
    /// Drawn behind an opaque background pixel
    pub behind: bool,
    /// Belongs to sprite 0 and can raise the hit flag
    pub zero: bool,
    /// Palette RAM index (0x10-0x1f)
    pub color: u8,
}

/// Where the OAM scan stands on the current line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Before dot 64
    Idle,
    /// Looking for the next sprite in range
    Scan,
    /// Copying byte 1, 2 or 3 of a sprite in range
    Copy(u8),
    /// Buffer full, scanning for the overflow flag
    Overflow,
    /// Copying the remaining bytes of the overflowing sprite
    OverflowCopy(u8),
    /// Done for this line
    Done,
}

/// Manages OAM, per-line sprite evaluation and the sprite line map
pub struct Sprites {
    /// Sprites drawn on the current dot (left edge clipping applied)
    pub enabled: bool,
    /// `enabled` and at least one sprite pixel on the line
    pub active: bool,
    /// The line map holds pixels for this line
    pub visible: bool,
    /// OAM (Object Attribute Memory) - 256 bytes for sprite data
    oam: [u8; 256],
    /// Last byte read from OAM by the scan
    pub latch: u8,
    phase: Phase,
    /// Sprites looked at so far on this line
    index: usize,
    /// OAM byte address of the scan
    addr: usize,
    /// Secondary OAM: bytes of the sprites found for the next line
    buffer: Vec<u8>,
    /// Bytes used in `buffer`
    buffered: usize,
    /// Sprite 0 made it into `buffer`
    zero_in_line: bool,
    /// First opaque sprite pixel per X position
    map: [Option<SpritePixel>; MAP_SIZE],
}

impl Sprites {
    /// `limit` is the number of sprites the scan keeps per line
    pub fn new(limit: usize) -> Self {
        Self {
            enabled: false,
            active: false,
            visible: false,
            oam: [0xff; 256],
            latch: 0,
            phase: Phase::Idle,
            index: 0,
            addr: 0,
            buffer: vec![0; limit * 4],
            buffered: 0,
            zero_in_line: false,
            map: [None; MAP_SIZE],
        }
    }

    pub fn reset(&mut self) {
        let limit = self.buffer.len() / 4;
        *self = Self::new(limit);
    }

    pub fn read_oam(&self, addr: u8) -> u8 {
        self.oam[addr as usize]
    }

    pub fn write_oam(&mut self, addr: u8, value: u8) {
        self.oam[addr as usize] = value;
    }

    /// Fast OAM DMA: copy a whole page and drop the unimplemented
    /// attribute bits
    pub fn dma(&mut self, page: &[u8]) {
        self.oam.copy_from_slice(&page[..256]);
        for sprite in self.oam.chunks_exact_mut(4) {
            sprite[2] &= OAM_ATTRIBUTE_MASK;
        }
    }

    /// Bytes of secondary OAM in use
    pub fn buffered(&self) -> usize {
        self.buffered
    }

    /// Prepare the scan for a new line (dot 320)
    pub fn begin_line(&mut self) {
        self.buffered = 0;
        self.zero_in_line = false;
        self.index = 0;
        self.phase = Phase::Idle;
    }

    /// Start the scan at dot 64 from the OAM address register
    pub fn start_evaluation(&mut self, oam_addr: u8) {
        self.addr = (oam_addr & 0xf8) as usize;
        self.phase = Phase::Scan;
        self.latch = 0xff;
    }

    pub fn evaluate_even(&mut self) {
        self.latch = self.oam[self.addr & 0xff];
    }

    fn in_range(&self, scanline: i32, height: i32) -> bool {
        let y = self.latch as i32;
        y <= scanline && scanline < y + height
    }

    /// Odd evaluation dot. Returns true when the overflow flag must be set.
    pub fn evaluate_odd(&mut self, scanline: i32, height: i32) -> bool {
        match self.phase {
            Phase::Idle => {}
            Phase::Scan => {
                self.index += 1;
                if self.in_range(scanline, height) {
                    self.addr += 1;
                    self.phase = Phase::Copy(1);
                    self.buffer[self.buffered] = self.latch;
                } else if self.index == 64 {
                    self.addr = 0;
                    self.phase = Phase::Done;
                } else if self.index == 2 {
                    self.addr = 8;
                } else {
                    self.addr += 4;
                }
            }
            Phase::Copy(n @ (1 | 2)) => {
                self.addr += 1;
                self.phase = Phase::Copy(n + 1);
                self.buffer[self.buffered + n as usize] = self.latch;
            }
            Phase::Copy(_) => {
                self.buffer[self.buffered + 3] = self.latch;
                self.buffered += 4;
                if self.index != 64 {
                    self.phase = if self.buffered != self.buffer.len() {
                        Phase::Scan
                    } else {
                        Phase::Overflow
                    };
                    if self.index != 2 {
                        self.addr += 1;
                        self.zero_in_line |= self.index == 1;
                    } else {
                        self.addr = 8;
                    }
                } else {
                    self.addr = 0;
                    self.phase = Phase::Done;
                }
            }
            Phase::Overflow => {
                if self.in_range(scanline, height) {
                    self.phase = Phase::OverflowCopy(1);
                    self.addr = (self.addr + 1) & 0xff;
                    return true;
                }
                // the hardware bug: the byte offset advances along with the sprite
                self.addr = ((self.addr + 4) & 0xfc) + ((self.addr + 1) & 3);
                if self.addr <= 5 {
                    self.phase = Phase::Done;
                    self.addr &= 0xfc;
                }
            }
            Phase::OverflowCopy(n @ (1 | 2)) => {
                self.phase = Phase::OverflowCopy(n + 1);
                self.addr = (self.addr + 1) & 0xff;
            }
            Phase::OverflowCopy(_) => {
                self.phase = Phase::Done;
                self.addr = (self.addr + 1) & 0xff;
                if self.addr & 3 == 3 {
                    self.addr += 1;
                }
                self.addr &= 0xfc;
            }
            Phase::Done => {
                self.addr = (self.addr + 4) & 0xff;
            }
        }
        false
    }

    /// Pattern address of row `scanline` of the sprite at byte `idx` of
    /// secondary OAM
    pub fn pattern_addr(&self, idx: usize, scanline: i32, height: i32, base: u16) -> u16 {
        let flip_v = (self.buffer[idx + 2] >> 7) as i32;
        let row = (scanline - self.buffer[idx] as i32) ^ (flip_v * 0xf);
        let tile = self.buffer[idx + 1] as u16;
        let addr = if height == 16 {
            (tile & 0x01) << 12 | (tile & 0xfe) << 4 | ((row >> 3 & 1) as u16) << 4
        } else {
            base | tile << 4
        };
        addr | (row & 7) as u16
    }

    /// Draw the sprite at byte `idx` of secondary OAM into the line map.
    /// Pixels already taken by a lower-numbered sprite are kept.
    pub fn load(&mut self, pat0: u8, pat1: u8, idx: usize) {
        let attributes = self.buffer[idx + 2];
        let positions = &PIXEL_POSITIONS[(attributes >> 6 & 1) as usize];
        let (pat0, pat1) = (pat0 as u32, pat1 as u32);
        let pattern = (pat0 >> 1 & 0x55)
            | (pat1 & 0xaa)
            | ((pat0 & 0x55) | (pat1 << 1 & 0xaa)) << 8;
        let x_base = self.buffer[idx + 3] as usize;
        let palette_base = 0x10 + ((attributes & 3) << 2);
        if !self.visible {
            self.map.fill(None);
            self.visible = true;
        }
        for (dx, &position) in positions.iter().enumerate() {
            let x = x_base + dx;
            let color = (pattern >> (position * 2) & 3) as u8;
            if self.map[x].is_some() || color == 0 {
                continue;
            }
            self.map[x] = Some(SpritePixel {
                behind: attributes & 0x20 != 0,
                zero: idx == 0 && self.zero_in_line,
                color: palette_base + color,
            });
        }
        self.active = self.enabled;
    }

    pub fn pixel(&self, x: usize) -> Option<SpritePixel> {
        self.map[x]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Run a full scan of `oam` for `scanline` the way dots 64-255 do
    fn scan(sprites: &mut Sprites, scanline: i32, height: i32) -> bool {
        let mut overflow = false;
        sprites.begin_line();
        sprites.start_evaluation(0);
        for _ in 0..96 {
            sprites.evaluate_even();
            overflow |= sprites.evaluate_odd(scanline, height);
        }
        overflow
    }

    #[test]
    fn test_dma_masks_attributes() {
        let mut sprites = Sprites::new(8);
        sprites.dma(&[0xff; 256]);
        assert_eq!(sprites.read_oam(0), 0xff);
        assert_eq!(sprites.read_oam(2), 0xe3);
        assert_eq!(sprites.read_oam(6), 0xe3);
    }

    #[test]
    fn test_scan_copies_sprites_in_range() {
        let mut sprites = Sprites::new(8);
        let mut oam = [0xf0; 256];
        oam[0..4].copy_from_slice(&[10, 0x01, 0x02, 0x30]);
        oam[8..12].copy_from_slice(&[12, 0x05, 0x00, 0x40]);
        sprites.dma(&oam);
        assert!(!scan(&mut sprites, 15, 8));
        assert_eq!(sprites.buffered(), 8);
        assert_eq!(sprites.buffer[..8], [10, 0x01, 0x02, 0x30, 12, 0x05, 0x00, 0x40]);
        assert!(sprites.zero_in_line);
    }

    #[test]
    fn test_scan_skips_sprites_out_of_range() {
        let mut sprites = Sprites::new(8);
        let mut oam = [0xf0; 256];
        oam[4..8].copy_from_slice(&[100, 0x01, 0x02, 0x30]);
        sprites.dma(&oam);
        assert!(!scan(&mut sprites, 50, 8));
        assert_eq!(sprites.buffered(), 0);
        // tall sprites reach further down
        assert!(!scan(&mut sprites, 110, 16));
        assert_eq!(sprites.buffered(), 4);
        assert!(!sprites.zero_in_line);
    }

    #[test]
    fn test_ninth_sprite_overflows() {
        let mut sprites = Sprites::new(8);
        let mut oam = [0xf0; 256];
        for n in 0..9 {
            oam[n * 4] = 20;
        }
        sprites.dma(&oam);
        assert!(scan(&mut sprites, 20, 8));
        assert_eq!(sprites.buffered(), 32);
    }

    #[test]
    fn test_unlimited_buffer_takes_nine() {
        let mut sprites = Sprites::new(32);
        let mut oam = [0xf0; 256];
        for n in 0..9 {
            oam[n * 4] = 20;
        }
        sprites.dma(&oam);
        assert!(!scan(&mut sprites, 20, 8));
        assert_eq!(sprites.buffered(), 36);
    }

    #[test]
    fn test_pattern_addr_flips() {
        let mut sprites = Sprites::new(8);
        sprites.buffer[..4].copy_from_slice(&[10, 0x21, 0x00, 0]);
        assert_eq!(sprites.pattern_addr(0, 12, 8, 0x1000), 0x1212);
        sprites.buffer[2] = 0x80;
        assert_eq!(sprites.pattern_addr(0, 12, 8, 0x1000), 0x1215);
        // 8x16: bit 0 of the tile picks the table, row 10 is the lower half
        sprites.buffer[2] = 0;
        assert_eq!(sprites.pattern_addr(0, 20, 16, 0), 0x1212);
    }

    #[test]
    fn test_load_keeps_first_sprite_and_flips() {
        let mut sprites = Sprites::new(8);
        sprites.enabled = true;
        sprites.buffer[..8].copy_from_slice(&[0, 0, 0x01, 10, 0, 0, 0x42, 10]);
        // leftmost pixel only, color 1
        sprites.load(0x80, 0x00, 0);
        let first = sprites.pixel(10).unwrap();
        assert_eq!(first.color, 0x15);
        assert!(!first.zero);
        assert!(sprites.active);

        // second sprite flipped: its pixel lands on the right edge
        sprites.load(0x80, 0x80, 4);
        assert_eq!(sprites.pixel(10), Some(first));
        assert_eq!(sprites.pixel(17).unwrap().color, 0x1b);
    }
}
