/// PPU Control Register ($2000) bit constants
const GENERATE_NMI: u8 = 0b1000_0000;
const SPRITE_SIZE: u8 = 0b0010_0000;
const BG_PATTERN_TABLE_ADDR: u8 = 0b0001_0000;
const SPRITE_PATTERN_TABLE_ADDR: u8 = 0b0000_1000;
const VRAM_ADDR_INCREMENT: u8 = 0b0000_0100;
const BASE_NAMETABLE_ADDR: u8 = 0b0000_0011;

/// PPU Mask Register ($2001) bit constants
const SHOW_BACKGROUND: u8 = 0b0000_1000;
const SHOW_SPRITES: u8 = 0b0001_0000;
const SHOW_BACKGROUND_LEFT: u8 = 0b0000_0010;
const SHOW_SPRITES_LEFT: u8 = 0b0000_0100;
const GRAYSCALE: u8 = 0b0000_0001;
const EMPHASIS: u8 = 0b1110_0000;

/// Which layers PPUMASK turns on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Mask {
    pub bg_show: bool,
    pub bg_show_edge: bool,
    pub sp_show: bool,
    pub sp_show_edge: bool,
}

impl Mask {
    pub fn from_bits(data: u8) -> Self {
        let bg_show = data & SHOW_BACKGROUND != 0;
        let sp_show = data & SHOW_SPRITES != 0;
        Self {
            bg_show,
            bg_show_edge: data & SHOW_BACKGROUND_LEFT != 0 && bg_show,
            sp_show,
            sp_show_edge: data & SHOW_SPRITES_LEFT != 0 && sp_show,
        }
    }

    pub fn any_show(&self) -> bool {
        self.bg_show || self.sp_show
    }
}

/// Palette masking from PPUMASK: 0x30 in greyscale, else 0x3f
pub fn coloring(data: u8) -> u8 {
    if data & GRAYSCALE != 0 { 0x30 } else { 0x3f }
}

/// PPUMASK emphasis bits in palette index position
pub fn emphasis(data: u8) -> u16 {
    ((data & EMPHASIS) as u16) << 1
}

/// Register state behind $2000-$2007, including the "loopy" scroll
/// registers.
///
/// The current VRAM address is kept split in two: `addr_0_4` holds coarse
/// X and `addr_5_14` everything above it (coarse Y, nametable select and
/// fine Y), so a coarse X increment never has to carry into the rest.
pub struct Registers {
    /// Last value put on the PPU I/O bus
    pub io_latch: u8,
    /// PPUDATA read buffer
    pub io_buffer: u8,
    /// OAM address register ($2003)
    pub oam_address: u8,

    /// 1 or 32
    pub vram_addr_inc: u16,
    pub need_nmi: bool,
    /// Sprite pattern table for 8x8 sprites
    pub sp_base: u16,
    pub sp_height: i32,
    pub bg_pattern_base: u16,
    /// Pattern address used for the dummy sprite fetches
    pub pattern_end: u16,

    pub mask: Mask,

    /// w: write toggle shared by $2005 and $2006
    pub scroll_toggle: bool,
    /// t: temporary VRAM address
    pub scroll_latch: u16,
    /// v bits 0-4: coarse X
    pub addr_0_4: u16,
    /// v bits 5-14: coarse Y, nametable select, fine Y
    pub addr_5_14: u16,
    /// Nametable byte address derived from v
    pub name_io_addr: u16,
}

impl Registers {
    pub fn new() -> Self {
        Self {
            io_latch: 0,
            io_buffer: 0xe8,
            oam_address: 0,
            vram_addr_inc: 1,
            need_nmi: false,
            sp_base: 0,
            sp_height: 8,
            bg_pattern_base: 0,
            pattern_end: 0x0ff0,
            mask: Mask::default(),
            scroll_toggle: false,
            scroll_latch: 0,
            addr_0_4: 0,
            addr_5_14: 0,
            name_io_addr: 0x2000,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Apply a PPUCTRL write; returns the previous NMI enable
    pub fn write_control(&mut self, data: u8) -> bool {
        let need_nmi_old = self.need_nmi;
        self.scroll_latch = (self.scroll_latch & 0x73ff) | ((data & BASE_NAMETABLE_ADDR) as u16) << 10;
        self.vram_addr_inc = if data & VRAM_ADDR_INCREMENT != 0 { 32 } else { 1 };
        self.sp_base = if data & SPRITE_PATTERN_TABLE_ADDR != 0 { 0x1000 } else { 0 };
        self.bg_pattern_base = if data & BG_PATTERN_TABLE_ADDR != 0 { 0x1000 } else { 0 };
        self.sp_height = if data & SPRITE_SIZE != 0 { 16 } else { 8 };
        self.need_nmi = data & GENERATE_NMI != 0;
        self.io_latch = data;
        self.pattern_end = if self.sp_base != 0 || self.sp_height == 16 {
            0x1ff0
        } else {
            0x0ff0
        };
        need_nmi_old
    }

    /// $2005 write. Returns the new fine X scroll on the first write.
    pub fn write_scroll(&mut self, data: u8) -> Option<u8> {
        self.io_latch = data;
        self.scroll_toggle = !self.scroll_toggle;
        let data = data as u16;
        if self.scroll_toggle {
            // t: ....... ...ABCDE <- d: ABCDE...
            self.scroll_latch = self.scroll_latch & 0x7fe0 | data >> 3;
            Some((data & 7) as u8)
        } else {
            // t: FGH..AB CDE..... <- d: ABCDEFGH
            self.scroll_latch = (self.scroll_latch & 0x0c1f) | ((data << 2 | data << 12) & 0x73e0);
            None
        }
    }

    /// $2006 write; the second write loads v from t
    pub fn write_address(&mut self, data: u8) {
        self.io_latch = data;
        self.scroll_toggle = !self.scroll_toggle;
        if self.scroll_toggle {
            self.scroll_latch = self.scroll_latch & 0x00ff | ((data & 0x3f) as u16) << 8;
        } else {
            self.scroll_latch = (self.scroll_latch & 0x7f00) | data as u16;
            self.addr_0_4 = self.scroll_latch & 0x001f;
            self.addr_5_14 = self.scroll_latch & 0x7fe0;
            self.update_name_io_addr();
        }
    }

    /// Current VRAM address (v)
    pub fn vram_addr(&self) -> u16 {
        self.addr_0_4 | self.addr_5_14
    }

    pub fn update_name_io_addr(&mut self) {
        self.name_io_addr = (self.addr_0_4 | self.addr_5_14) & 0x0fff | 0x2000;
    }

    /// Step v after a PPUDATA access. While rendering, a 32-byte step
    /// behaves like a fine Y increment.
    pub fn increment_vram_addr(&mut self, rendering: bool) {
        if self.vram_addr_inc == 32 {
            if rendering {
                if self.addr_5_14 & 0x7000 == 0x7000 {
                    self.addr_5_14 &= 0x0fff;
                    match self.addr_5_14 & 0x03e0 {
                        0x03a0 => self.addr_5_14 ^= 0x0800,
                        0x03e0 => self.addr_5_14 &= 0x7c00,
                        _ => self.addr_5_14 += 0x20,
                    }
                } else {
                    self.addr_5_14 += 0x1000;
                }
            } else {
                self.addr_5_14 += 0x20;
            }
        } else if self.addr_0_4 < 0x1f {
            self.addr_0_4 += 1;
        } else {
            self.addr_0_4 = 0;
            self.addr_5_14 += 0x20;
        }
        self.addr_5_14 &= 0x7fe0;
        self.update_name_io_addr();
    }

    /// Coarse X increment, wrapping into the neighbouring nametable
    pub fn scroll_clock_x(&mut self) {
        if self.addr_0_4 < 0x001f {
            self.addr_0_4 += 1;
            self.name_io_addr += 1;
        } else {
            self.addr_0_4 = 0;
            self.addr_5_14 ^= 0x0400;
            self.name_io_addr ^= 0x041f;
        }
    }

    /// Copy the horizontal bits of t into v
    pub fn scroll_reset_x(&mut self) {
        self.addr_0_4 = self.scroll_latch & 0x001f;
        self.addr_5_14 = (self.addr_5_14 & 0x7be0) | (self.scroll_latch & 0x0400);
        self.update_name_io_addr();
    }

    /// Copy all of t into v (pre-render line)
    pub fn scroll_reset_y(&mut self) {
        self.addr_0_4 = self.scroll_latch & 0x001f;
        self.addr_5_14 = self.scroll_latch & 0x7fe0;
        self.update_name_io_addr();
    }

    /// Fine Y increment. Coarse Y wraps after row 29 into the other
    /// nametable; rows 30 and 31 wrap to 0 without switching.
    pub fn scroll_clock_y(&mut self) {
        if self.addr_5_14 & 0x7000 != 0x7000 {
            self.addr_5_14 += 0x1000;
        } else {
            match self.addr_5_14 & 0x03e0 {
                0x03a0 => {
                    self.addr_5_14 ^= 0x0800;
                    self.addr_5_14 &= 0x0c00;
                }
                0x03e0 => self.addr_5_14 &= 0x0c00,
                _ => self.addr_5_14 = (self.addr_5_14 & 0x0fe0) + 32,
            }
        }
        self.update_name_io_addr();
    }
}
